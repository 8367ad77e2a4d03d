pub use matrix::*;
pub use vector::*;

pub mod vector {
    use nalgebra_glm as glm;

    pub type Vec2 = glm::Vec2;
    pub type UVec2 = glm::UVec2;

    pub type Vec3 = glm::Vec3;

    pub type Vec4 = glm::Vec4;

    pub struct Axes;

    impl Axes {
        pub fn up() -> Vec3 {
            Vec3::new(0.0, 1.0, 0.0)
        }

        pub fn right() -> Vec3 {
            Vec3::new(1.0, 0.0, 0.0)
        }
    }
}

pub mod matrix {
    use super::vector::{Axes, Vec3};
    use nalgebra_glm as glm;

    pub type Mat4 = glm::Mat4;

    pub fn perspective(aspect: f32, fov_rad: f32, near: f32, far: f32) -> Mat4 {
        glm::perspective(aspect, fov_rad, near, far)
    }

    pub fn look_at(position: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
        glm::look_at(position, target, up)
    }

    pub fn inverse(mat: &Mat4) -> Mat4 {
        glm::inverse(mat)
    }

    /// Rotation whose local +Z axis points along `forward`.
    ///
    /// A zero `forward` yields the identity.
    pub fn orientation_from_forward(forward: &Vec3) -> Mat4 {
        let length = glm::length(forward);
        if length <= f32::EPSILON {
            return Mat4::identity();
        }

        let f = forward / length;
        let reference = if glm::dot(&f, &Axes::up()).abs() > 0.999 {
            Axes::right()
        } else {
            Axes::up()
        };

        let r = glm::normalize(&glm::cross(&reference, &f));
        let u = glm::cross(&f, &r);

        Mat4::new(
            r.x, u.x, f.x, 0.0, //
            r.y, u.y, f.y, 0.0, //
            r.z, u.z, f.z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Translation * orientation * scale.
    pub fn model_matrix(position: &Vec3, orientation: &Mat4, scale: &Vec3) -> Mat4 {
        glm::scale(&(glm::translation(position) * orientation), scale)
    }

    pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
        let p = matrix * glm::vec4(point.x, point.y, point.z, 1.0);
        glm::vec3(p.x, p.y, p.z) / p.w
    }
}
