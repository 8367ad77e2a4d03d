use crate::rendering::device::{DeviceError, DeviceResult};
use gl::types::*;
use std::ffi::CString;
use std::{mem, ptr};

/// Upper bound on queued GL errors drained before an allocation.
const MAX_PENDING_ERRORS: usize = 16;

bitflags! {
    pub struct BufferStorageFlags : u32 {
        const NONE = 0;
        const DYNAMIC = gl::DYNAMIC_STORAGE_BIT;
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferTarget {
    Array = gl::ARRAY_BUFFER,
    ElementArray = gl::ELEMENT_ARRAY_BUFFER,
    Uniform = gl::UNIFORM_BUFFER,
}

/// Immutable-storage GL buffer.
#[derive(Debug)]
pub struct Buffer {
    name: String,
    id: GLuint,
    size: isize,
    storage_flags: BufferStorageFlags,
    target: BufferTarget,
}

impl Buffer {
    pub fn new(
        name: &str,
        size: isize,
        target: BufferTarget,
        storage_flags: BufferStorageFlags,
    ) -> DeviceResult<Self> {
        Self::create(name, size, ptr::null(), target, storage_flags)
    }

    pub fn new_from_slice<T>(
        name: &str,
        data: &[T],
        target: BufferTarget,
        storage_flags: BufferStorageFlags,
    ) -> DeviceResult<Self> {
        let size = (data.len() * mem::size_of::<T>()) as isize;
        Self::create(
            name,
            size,
            data.as_ptr() as *const GLvoid,
            target,
            storage_flags,
        )
    }

    fn create(
        name: &str,
        size: isize,
        data: *const GLvoid,
        target: BufferTarget,
        storage_flags: BufferStorageFlags,
    ) -> DeviceResult<Self> {
        // Zero sized storage is an error in GL.
        if size <= 0 {
            return Err(DeviceError::ResourceCreation {
                kind: "buffer",
                label: name.to_string(),
                reason: "buffer storage must not be empty".to_string(),
            });
        }

        let label = object_label("buffer", name)?;

        let mut id: GLuint = 0;
        let error = unsafe {
            drain_errors();
            gl::CreateBuffers(1, &mut id);
            gl::NamedBufferStorage(id, size, data, storage_flags.bits());
            gl::GetError()
        };

        if let Some(reason) = gl_error_reason(error) {
            unsafe { gl::DeleteBuffers(1, &id) }
            return Err(DeviceError::ResourceCreation {
                kind: "buffer",
                label: name.to_string(),
                reason,
            });
        }

        unsafe { gl::ObjectLabel(gl::BUFFER, id, -1, label.as_ptr()) }

        Ok(Self {
            name: name.to_string(),
            id,
            size,
            storage_flags,
            target,
        })
    }

    pub fn bind_range(&self, binding_index: u32, offset: isize, size: isize) -> DeviceResult<()> {
        if self.target != BufferTarget::Uniform {
            return Err(DeviceError::InvalidHandle {
                kind: "uniform buffer",
                id: self.id,
            });
        }
        if offset < 0 || offset + size > self.size {
            return Err(DeviceError::ResourceCreation {
                kind: "uniform range",
                label: self.name.clone(),
                reason: format!(
                    "range {}..{} exceeds buffer size {}",
                    offset,
                    offset + size,
                    self.size
                ),
            });
        }

        unsafe { gl::BindBufferRange(self.target as u32, binding_index, self.id, offset, size) }

        Ok(())
    }

    /// Writes `data` at the start of the buffer. The buffer must be dynamic and large enough.
    pub fn fill_bytes(&self, data: &[u8]) -> bool {
        if !self.storage_flags.contains(BufferStorageFlags::DYNAMIC)
            || data.len() as isize > self.size
        {
            return false;
        }

        unsafe {
            gl::NamedBufferSubData(
                self.id,
                0,
                data.len() as isize,
                data.as_ptr() as *const GLvoid,
            )
        }

        true
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn size(&self) -> isize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { gl::DeleteBuffers(1, &self.id) }
    }
}

/// Clears errors raised by earlier calls so the next `GetError` reports only what follows.
unsafe fn drain_errors() {
    for _ in 0..MAX_PENDING_ERRORS {
        if gl::GetError() == gl::NO_ERROR {
            break;
        }
    }
}

pub(crate) fn gl_error_reason(error: GLenum) -> Option<String> {
    let reason = match error {
        gl::NO_ERROR => return None,
        gl::OUT_OF_MEMORY => "out of memory",
        gl::INVALID_VALUE => "invalid value",
        gl::INVALID_OPERATION => "invalid operation",
        gl::INVALID_ENUM => "invalid enum",
        other => return Some(format!("GL error {:#x}", other)),
    };
    Some(reason.to_string())
}

/// Debug group messages with interior NULs dropped, so a push always happens.
pub(crate) fn debug_label(label: &str) -> CString {
    CString::new(label.replace('\0', "")).unwrap_or_default()
}

pub(crate) fn object_label(kind: &'static str, name: &str) -> DeviceResult<CString> {
    CString::new(name).map_err(|e| DeviceError::ResourceCreation {
        kind,
        label: name.replace('\0', ""),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_label_rejects_interior_nul() {
        assert!(object_label("buffer", "Deferred lights").is_ok());
        assert!(matches!(
            object_label("buffer", "bad\0label"),
            Err(DeviceError::ResourceCreation { kind: "buffer", .. })
        ));
    }

    #[test]
    fn test_storage_errors_are_reported() {
        assert_eq!(gl_error_reason(gl::NO_ERROR), None);
        assert_eq!(
            gl_error_reason(gl::OUT_OF_MEMORY).as_deref(),
            Some("out of memory")
        );
        assert_eq!(
            gl_error_reason(gl::INVALID_VALUE).as_deref(),
            Some("invalid value")
        );
        assert_eq!(gl_error_reason(0x9999).as_deref(), Some("GL error 0x9999"));
    }

    #[test]
    fn test_debug_label_strips_interior_nul() {
        assert_eq!(debug_label("Finish lighting").as_bytes(), b"Finish lighting");
        assert_eq!(debug_label("bad\0label").as_bytes(), b"badlabel");
    }
}
