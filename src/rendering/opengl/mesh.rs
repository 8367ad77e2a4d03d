use crate::core::math::Vec3;
use crate::rendering::device::DeviceResult;
use crate::rendering::mesh::MeshData;
use crate::rendering::opengl::buffer::{Buffer, BufferStorageFlags, BufferTarget};
use gl::types::*;
use log::debug;
use std::{mem, ptr};

/// Position-only indexed mesh in a vertex array object.
pub struct GlMesh {
    vao: GLuint,
    index_count: usize,
    _vbo: Buffer,
    _ibo: Buffer,
}

impl GlMesh {
    pub fn new(label: &str, data: &MeshData) -> DeviceResult<GlMesh> {
        debug!(
            "Creating mesh '{}' with {} vertices and {} indices.",
            label,
            data.positions.len(),
            data.indices.len()
        );

        let vbo = Buffer::new_from_slice(
            &format!("{} vertices", label),
            &data.positions,
            BufferTarget::Array,
            BufferStorageFlags::NONE,
        )?;

        let ibo = Buffer::new_from_slice(
            &format!("{} indices", label),
            &data.indices,
            BufferTarget::ElementArray,
            BufferStorageFlags::NONE,
        )?;

        let mut vao: GLuint = 0;
        unsafe {
            gl::CreateVertexArrays(1, &mut vao);

            gl::VertexArrayVertexBuffer(vao, 0, vbo.id(), 0, mem::size_of::<Vec3>() as i32);
            gl::VertexArrayElementBuffer(vao, ibo.id());

            gl::EnableVertexArrayAttrib(vao, 0); //positions
            gl::VertexArrayAttribFormat(vao, 0, 3, gl::FLOAT, gl::FALSE, 0);
            gl::VertexArrayAttribBinding(vao, 0, 0);
        }

        Ok(GlMesh {
            vao,
            index_count: data.indices.len(),
            _vbo: vbo,
            _ibo: ibo,
        })
    }

    pub fn draw(&self) {
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::DrawElements(
                gl::TRIANGLES,
                self.index_count as i32,
                gl::UNSIGNED_SHORT,
                ptr::null(),
            );
            gl::BindVertexArray(0);
        }
    }
}

impl Drop for GlMesh {
    fn drop(&mut self) {
        unsafe { gl::DeleteVertexArrays(1, &self.vao) }
    }
}

/// Attribute-less triangle covering the screen; the vertex shader derives positions from the vertex id.
pub struct FullscreenTriangle {
    vao: GLuint,
}

impl FullscreenTriangle {
    pub fn new() -> Self {
        let mut vao: GLuint = 0;

        unsafe { gl::CreateVertexArrays(1, &mut vao) }

        FullscreenTriangle { vao }
    }

    pub fn draw(&self) {
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::DrawArrays(gl::TRIANGLES, 0, 3);
            gl::BindVertexArray(0);
        }
    }
}

impl Drop for FullscreenTriangle {
    fn drop(&mut self) {
        unsafe { gl::DeleteVertexArrays(1, &self.vao) }
    }
}
