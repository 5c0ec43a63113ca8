use glam::{Affine3A, Quat, Vec3, Vec4};

/// Spot cone description. Both angles are half angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCone {
    pub outer_cone: f32,
    /// Authored inner half angle. Lights without an authoring component
    /// (particle lights) leave this empty and get a synthetic inner cone.
    pub inner_cone: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot(SpotCone),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightmapBakeType {
    #[default]
    Realtime,
    Baked,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixedLightingMode {
    #[default]
    IndirectOnly,
    Shadowmask,
    Subtractive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightShadows {
    #[default]
    None,
    Hard,
    Soft,
}

/// Output of the light baking step for one light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightBakingOutput {
    /// Channel of the baked occlusion probe holding this light's shadowing.
    pub occlusion_mask_channel: Option<u32>,
    pub lightmap_bake_type: LightmapBakeType,
    pub mixed_lighting_mode: MixedLightingMode,
}

/// A light that survived culling this frame.
///
/// Owned by the culling subsystem; the light core only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleLight {
    pub kind: LightKind,
    /// Light space to world space. The light shines along local +Z.
    pub world_matrix: Affine3A,
    pub range: f32,
    /// Linear color with intensity already applied.
    pub final_color: Vec4,
    pub shadows: LightShadows,
    /// Missing for lights that have no baking data (e.g. particle lights).
    pub baking: Option<LightBakingOutput>,
}

impl VisibleLight {
    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32, rotation: Quat) -> Self {
        Self {
            kind: LightKind::Directional,
            world_matrix: Affine3A::from_quat(rotation),
            range: 0.0,
            final_color: (color * intensity).extend(1.0),
            shadows: LightShadows::None,
            baking: None,
        }
    }

    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, position: Vec3, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            world_matrix: Affine3A::from_translation(position),
            range,
            final_color: (color * intensity).extend(1.0),
            shadows: LightShadows::None,
            baking: None,
        }
    }

    #[must_use]
    pub fn new_spot(
        color: Vec3,
        intensity: f32,
        position: Vec3,
        rotation: Quat,
        range: f32,
        cone: SpotCone,
    ) -> Self {
        Self {
            kind: LightKind::Spot(cone),
            world_matrix: Affine3A::from_rotation_translation(rotation, position),
            range,
            final_color: (color * intensity).extend(1.0),
            shadows: LightShadows::None,
            baking: None,
        }
    }

    #[must_use]
    pub fn with_shadows(mut self, shadows: LightShadows) -> Self {
        self.shadows = shadows;
        self
    }

    #[must_use]
    pub fn with_baking(mut self, baking: LightBakingOutput) -> Self {
        self.baking = Some(baking);
        self
    }

    /// World-space light origin.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    /// World-space local +Z axis, as stored in the transform (not normalized).
    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.world_matrix.matrix3.z_axis.into()
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional)
    }

    /// True when this light contributes to subtractive mixed lighting.
    #[must_use]
    pub fn is_subtractive_shadow_caster(&self) -> bool {
        self.baking.is_some_and(|baking| {
            baking.lightmap_bake_type == LightmapBakeType::Mixed
                && baking.mixed_lighting_mode == MixedLightingMode::Subtractive
        }) && self.shadows != LightShadows::None
    }
}
