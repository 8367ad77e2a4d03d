use serde::{Deserialize, Serialize};

/// Optional base, multiplier, adder and clamp applied to a scalar in that order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusAdjustment {
    pub base: Option<f32>,
    pub multiplier: Option<f32>,
    pub adder: Option<f32>,
    pub minimum: Option<f32>,
    pub maximum: Option<f32>,
}

impl RadiusAdjustment {
    pub fn apply(&self, input: f32) -> f32 {
        let mut value = self.base.unwrap_or(input);

        if let Some(multiplier) = self.multiplier {
            value *= multiplier;
        }
        if let Some(adder) = self.adder {
            value += adder;
        }
        if let Some(minimum) = self.minimum {
            value = value.max(minimum);
        }
        if let Some(maximum) = self.maximum {
            value = value.min(maximum);
        }

        value
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingProfile {
    /// Applied to point, cone and tube light radii while rendering the cockpit.
    pub cockpit_light_radius_modifier: RadiusAdjustment,
}
