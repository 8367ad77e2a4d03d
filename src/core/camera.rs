use crate::core::math::{self, Axes, Mat4, Vec3};
use crate::core::Settings;

/// Eye used for a frame: where the view and projection transforms come from.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    transform: Mat4,
    fov: f32,
    aspect: f32,
    near_plane: f32,
    far_plane: f32,
}

impl Camera {
    pub fn new(
        position: Vec3,
        target: Vec3,
        fov: f32,
        aspect: f32,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        Camera {
            position,
            transform: math::look_at(&position, &target, &Axes::up()),
            fov,
            aspect,
            near_plane,
            far_plane,
        }
    }

    pub fn from_settings(position: Vec3, target: Vec3, settings: &Settings) -> Self {
        Self::new(
            position,
            target,
            settings.fov,
            settings.screen_size.aspect(),
            settings.near_draw_distance,
            settings.far_draw_distance,
        )
    }

    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform
    }

    pub fn projection_matrix(&self) -> Mat4 {
        math::perspective(self.aspect, self.fov, self.near_plane, self.far_plane)
    }

    pub fn inverse_view_matrix(&self) -> Mat4 {
        math::inverse(&self.transform)
    }

    pub fn inverse_projection_matrix(&self) -> Mat4 {
        math::inverse(&self.projection_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform_point;

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 0.0),
            0.75,
            16.0 / 9.0,
            1.0,
            1000.0,
        );

        let eye = transform_point(&camera.view_matrix(), camera.position());
        assert!(eye.norm() < 0.001);

        let back = transform_point(&camera.inverse_view_matrix(), &Vec3::zeros());
        assert!((back - camera.position()).norm() < 0.001);
    }
}
