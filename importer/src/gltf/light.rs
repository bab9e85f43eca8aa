//! `KHR_lights_punctual` conversion.

use std::f32::consts::{FRAC_PI_4, PI};

use crate::math::RAD_TO_DEG;
use crate::scene::{LightDescriptor, LightKind};

use super::document;
use super::error::ImportError;
use super::options::Hooks;

/// Range used when a light declares none (unbounded in glTF).
const DEFAULT_RANGE: f32 = 9999.0;

/// Factor converting glTF candela/lux intensity into luminous power for a
/// light kind. Cone angles are in radians.
pub fn photometric_conversion(kind: LightKind, inner_cone: f32, outer_cone: f32) -> f32 {
    match kind {
        LightKind::Directional => 1.0,
        LightKind::Point => 4.0 * PI,
        LightKind::Spot => {
            let inner = inner_cone.cos();
            let outer = outer_cone.cos();
            2.0 * PI * ((1.0 - inner) + (inner - outer) / 2.0)
        }
    }
}

pub(crate) fn build_light(
    index: usize,
    light: &document::Light,
    hooks: &Hooks<document::Light, LightDescriptor>,
) -> Result<LightDescriptor, ImportError> {
    hooks.run(light, || {
        let kind = match light.light_type.as_str() {
            "directional" => LightKind::Directional,
            "point" => LightKind::Point,
            "spot" => LightKind::Spot,
            other => {
                return Err(ImportError::ExtensionData(format!(
                    "light {index} has unknown type '{other}'"
                )));
            }
        };
        let inner = light.spot.as_ref().and_then(|s| s.inner_cone_angle).unwrap_or(0.0);
        let outer = light
            .spot
            .as_ref()
            .and_then(|s| s.outer_cone_angle)
            .unwrap_or(FRAC_PI_4);

        Ok(LightDescriptor {
            kind,
            color: light.color.unwrap_or([1.0, 1.0, 1.0]),
            intensity: light.intensity.unwrap_or(1.0).clamp(0.0, 2.0),
            luminance: light
                .intensity
                .map(|i| i * photometric_conversion(kind, inner, outer)),
            range: light.range.unwrap_or(DEFAULT_RANGE),
            inner_cone_degrees: inner * RAD_TO_DEG,
            outer_cone_degrees: outer * RAD_TO_DEG,
        })
    })
}
