//! Light constant packing
//!
//! Converts a [`VisibleLight`] into the five vectors the forward shader reads.
//! The coefficients are laid out so the shader applies each falloff with a
//! single multiply-add:
//!
//! ```text
//! distance (fast):    smooth = saturate(distSqr * atten.x + atten.y)
//! distance (precise): smooth = (1 - saturate((distSqr * atten.x)^2))^2
//! spot cone:          angle  = saturate(dot(spotDir, L) * atten.z + atten.w)^2
//! ```
//!
//! The fast curve is a linear fade starting at 80 % of the range, used on
//! constrained platforms. The precise curve matches the baked lighting
//! falloff. Both reach zero at the light range.
//!
//! [`distance_smooth_factor`] and [`angle_attenuation`] evaluate the same
//! formulas on the CPU.

use glam::{Vec2, Vec3, Vec4};

use crate::resources::uniforms::PackedLightRecord;
use crate::scene::light::{LightBakingOutput, LightKind, SpotCone, VisibleLight};

/// Squared fraction of the range where the fast fade starts (0.8²).
pub const FADE_START_FRACTION_SQR: f32 = 0.8 * 0.8;

const MIN_RANGE_SQR: f32 = 0.0001;
const MIN_ANGLE_RANGE: f32 = 0.001;

/// Inner/outer tangent ratio of the synthetic inner cone used when a spot
/// light has no authored inner angle.
const SYNTHETIC_INNER_CONE_RATIO: f32 = (64.0 - 18.0) / 64.0;

// ============================================================================
// Frame context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixedLightingSetup {
    #[default]
    None,
    Subtractive,
}

/// Per-frame state threaded through light packing. Reset at frame start.
#[derive(Debug, Clone, Default)]
pub struct FrameLightingContext {
    pub mixed_lighting: MixedLightingSetup,
}

impl FrameLightingContext {
    pub fn reset(&mut self) {
        self.mixed_lighting = MixedLightingSetup::None;
    }

    fn observe_additional_light(&mut self, light: &VisibleLight) {
        if self.mixed_lighting == MixedLightingSetup::None && light.is_subtractive_shadow_caster() {
            self.mixed_lighting = MixedLightingSetup::Subtractive;
        }
    }
}

// ============================================================================
// Coefficients
// ============================================================================

/// Distance fade coefficients for a punctual light of the given range.
#[must_use]
pub fn distance_attenuation(range: f32, fast: bool) -> Vec2 {
    let range_sqr = (range * range).max(MIN_RANGE_SQR);
    if fast {
        let fade_start_sqr = FADE_START_FRACTION_SQR * range_sqr;
        let fade_range_sqr = fade_start_sqr - range_sqr;
        let inv_fade_range = 1.0 / fade_range_sqr;
        // y = -rangeSqr * x so the fade cancels to exactly zero at the range
        Vec2::new(inv_fade_range, -range_sqr * inv_fade_range)
    } else {
        Vec2::new(1.0 / range_sqr, 0.0)
    }
}

/// Cosine of the inner half angle, authored or synthetic.
#[must_use]
pub fn inner_cone_cos(cone: &SpotCone) -> f32 {
    match cone.inner_cone {
        Some(inner) => inner.cos(),
        None => (cone.outer_cone.tan() * SYNTHETIC_INNER_CONE_RATIO).atan().cos(),
    }
}

/// Spot cone coefficients `(1 / (cosInner - cosOuter), -cosOuter / (cosInner - cosOuter))`.
#[must_use]
pub fn spot_attenuation(cone: &SpotCone) -> Vec2 {
    let cos_outer = cone.outer_cone.cos();
    let cos_inner = inner_cone_cos(cone);
    let inv_angle_range = 1.0 / (cos_inner - cos_outer).max(MIN_ANGLE_RANGE);
    Vec2::new(inv_angle_range, -cos_outer * inv_angle_range)
}

/// Occlusion probe selector: `(channel, 0)` when baked, `(0, 1)` otherwise.
#[must_use]
pub fn occlusion_probe_channels(baking: Option<&LightBakingOutput>) -> Vec4 {
    let channel = baking.and_then(|b| b.occlusion_mask_channel);
    let mut channels = PackedLightRecord::default().occlusion_probe_channels;
    match channel {
        Some(channel) => {
            channels.x = channel as f32;
            channels.y = 0.0;
        }
        None => {
            channels.x = 0.0;
            channels.y = 1.0;
        }
    }
    channels
}

// ============================================================================
// Packing
// ============================================================================

/// Packs one light.
///
/// Additional lights (not `is_main`) may flip the frame's mixed lighting
/// setup to subtractive.
#[must_use]
pub fn pack_light(
    light: &VisibleLight,
    is_main: bool,
    fast_attenuation: bool,
    ctx: &mut FrameLightingContext,
) -> PackedLightRecord {
    let mut record = PackedLightRecord::default();

    if light.is_directional() {
        record.position = (-light.forward()).extend(0.0);
    } else {
        record.position = light.position().extend(1.0);
        let distance = distance_attenuation(light.range, fast_attenuation);
        record.attenuation.x = distance.x;
        record.attenuation.y = distance.y;
    }

    record.color = light.final_color;

    if let LightKind::Spot(cone) = &light.kind {
        let dir = -light.forward().normalize_or(Vec3::Z);
        record.spot_direction = dir.extend(cone.outer_cone.tan());

        let angle = spot_attenuation(cone);
        record.attenuation.z = angle.x;
        record.attenuation.w = angle.y;
    }

    record.occlusion_probe_channels = occlusion_probe_channels(light.baking.as_ref());

    if !is_main {
        ctx.observe_additional_light(light);
    }

    record
}

/// Packs the main light, or returns the "no light" defaults.
#[must_use]
pub fn pack_main_light(
    lights: &[VisibleLight],
    main_light_index: Option<usize>,
    fast_attenuation: bool,
    ctx: &mut FrameLightingContext,
) -> PackedLightRecord {
    main_light_index
        .and_then(|i| lights.get(i))
        .map_or_else(PackedLightRecord::default, |light| {
            pack_light(light, true, fast_attenuation, ctx)
        })
}

// ============================================================================
// CPU evaluation of the shader formulas
// ============================================================================

/// Distance smoothing factor the shader applies on top of `1 / distSqr`.
#[must_use]
pub fn distance_smooth_factor(attenuation: Vec4, distance_sqr: f32, fast: bool) -> f32 {
    if fast {
        (distance_sqr * attenuation.x + attenuation.y).clamp(0.0, 1.0)
    } else {
        let factor = distance_sqr * attenuation.x;
        let smooth = 1.0 - (factor * factor).clamp(0.0, 1.0);
        smooth * smooth
    }
}

/// Spot cone attenuation for `cos_angle = dot(spotDir, L)`.
#[must_use]
pub fn angle_attenuation(attenuation: Vec4, cos_angle: f32) -> f32 {
    let atten = (cos_angle * attenuation.z + attenuation.w).clamp(0.0, 1.0);
    atten * atten
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn fast_curve_starts_fading_at_80_percent() {
        let atten = distance_attenuation(10.0, true).extend(0.0).extend(0.0);
        let at_fade_start = 0.8 * 0.8 * 100.0;
        assert!((distance_smooth_factor(atten, at_fade_start, true) - 1.0).abs() < EPSILON);
        assert!(distance_smooth_factor(atten, 0.9 * 0.9 * 100.0, true) < 1.0);
    }

    #[test]
    fn precise_curve_coefficients() {
        let atten = distance_attenuation(4.0, false);
        assert!((atten.x - 1.0 / 16.0).abs() < EPSILON);
        assert_eq!(atten.y, 0.0);
    }

    #[test]
    fn zero_range_stays_finite() {
        for fast in [true, false] {
            let atten = distance_attenuation(0.0, fast);
            assert!(atten.x.is_finite() && atten.y.is_finite());
        }
    }

    #[test]
    fn synthetic_inner_cone_is_inside_outer() {
        let cone = SpotCone {
            outer_cone: 30f32.to_radians(),
            inner_cone: None,
        };
        assert!(inner_cone_cos(&cone) > cone.outer_cone.cos());
    }

    #[test]
    fn degenerate_cone_clamps_angle_range() {
        let cone = SpotCone {
            outer_cone: 0.5,
            inner_cone: Some(0.5),
        };
        let atten = spot_attenuation(&cone);
        assert!((atten.x - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn main_light_does_not_flip_mixed_lighting() {
        use crate::scene::light::{LightShadows, LightmapBakeType, MixedLightingMode};

        let light = VisibleLight::new_directional(Vec3::ONE, 1.0, Quat::IDENTITY)
            .with_shadows(LightShadows::Soft)
            .with_baking(LightBakingOutput {
                occlusion_mask_channel: Some(0),
                lightmap_bake_type: LightmapBakeType::Mixed,
                mixed_lighting_mode: MixedLightingMode::Subtractive,
            });

        let mut ctx = FrameLightingContext::default();
        let _ = pack_light(&light, true, false, &mut ctx);
        assert_eq!(ctx.mixed_lighting, MixedLightingSetup::None);

        let _ = pack_light(&light, false, false, &mut ctx);
        assert_eq!(ctx.mixed_lighting, MixedLightingSetup::Subtractive);

        ctx.reset();
        assert_eq!(ctx.mixed_lighting, MixedLightingSetup::None);
    }

    #[test]
    fn missing_main_light_uses_defaults() {
        let mut ctx = FrameLightingContext::default();
        let record = pack_main_light(&[], None, false, &mut ctx);
        assert_eq!(record, PackedLightRecord::default());

        let record = pack_main_light(&[], Some(3), false, &mut ctx);
        assert_eq!(record, PackedLightRecord::default());
    }
}
