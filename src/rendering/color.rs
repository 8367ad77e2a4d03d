use crate::core::math::Vec3;

pub fn scale_intensity(color: &Vec3, intensity: f32) -> Vec3 {
    color * intensity
}

/// 8-bit RGB to normalized floats.
pub fn rgb8_to_vec3(rgb: [u8; 3]) -> Vec3 {
    Vec3::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_to_vec3() {
        let color = rgb8_to_vec3([255, 0, 51]);
        assert!((color - Vec3::new(1.0, 0.0, 0.2)).norm() < 0.001);
    }
}
