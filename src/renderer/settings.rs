//! Lighting Settings & Platform Capabilities
//!
//! This module defines the static configuration of the light preparation
//! core. Everything here is decided once, when [`ForwardLights`] is built,
//! and stays fixed for the lifetime of the instance.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use forward_lights::{ForwardLights, LightingSettings, PlatformCapabilities};
//!
//! // Desktop defaults: 32 additional lights, precise attenuation
//! let lights = ForwardLights::new(LightingSettings::default(), PlatformCapabilities::desktop())?;
//!
//! // Constrained platform: fewer lights, fast attenuation, no structured buffers
//! let caps = PlatformCapabilities::mobile();
//! let lights = ForwardLights::new(LightingSettings::for_platform(&caps), caps)?;
//! ```
//!
//! [`ForwardLights`]: crate::renderer::lights::ForwardLights

use serde::{Deserialize, Serialize};

use crate::errors::{LightingError, Result};

/// Number of light indices packed into one element of the per-cluster
/// index buffer.
pub const CLUSTER_INDEX_PACKING: u32 = 4;

// ---------------------------------------------------------------------------
// AdditionalLightsMode
// ---------------------------------------------------------------------------

/// How additional (non-main) lights are shaded.
///
/// | Mode        | Evaluated in      | Light lookup                 |
/// |-------------|-------------------|------------------------------|
/// | `PerVertex` | vertex stage      | per-object light list        |
/// | `PerPixel`  | fragment stage    | per-object light list        |
/// | `Clustered` | fragment stage    | screen-space × depth grid    |
///
/// `Clustered` needs a compute backend to build the grid; without one the
/// frame is shaded `PerPixel` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdditionalLightsMode {
    PerVertex,
    #[default]
    PerPixel,
    Clustered,
}

impl AdditionalLightsMode {
    /// Returns the mode actually used this frame.
    ///
    /// `Clustered` falls back to `PerPixel` when `compute_available` is false;
    /// every other mode is returned unchanged.
    #[inline]
    #[must_use]
    pub fn resolve(self, compute_available: bool) -> Self {
        match self {
            Self::Clustered if !compute_available => Self::PerPixel,
            mode => mode,
        }
    }
}

// ---------------------------------------------------------------------------
// PlatformCapabilities
// ---------------------------------------------------------------------------

/// Result of probing the device once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    /// Compute dispatch is available to build the cluster grid.
    pub supports_compute_shaders: bool,

    /// Additional lights are uploaded as one structured record buffer plus
    /// an index buffer, instead of five fixed-size uniform arrays.
    pub use_structured_buffer: bool,

    /// Constrained platforms use the linear distance fade (starts at 80 % of
    /// the range) instead of the curve matching the baked lighting falloff.
    pub fast_attenuation: bool,
}

impl PlatformCapabilities {
    #[must_use]
    pub const fn desktop() -> Self {
        Self {
            supports_compute_shaders: true,
            use_structured_buffer: true,
            fast_attenuation: false,
        }
    }

    #[must_use]
    pub const fn mobile() -> Self {
        Self {
            supports_compute_shaders: false,
            use_structured_buffer: false,
            fast_attenuation: true,
        }
    }

    /// Derives capabilities from a wgpu adapter's downlevel flags and backend.
    ///
    /// Structured buffers and compute both require storage buffer support in
    /// the fragment stage; GL/WebGL backends are treated as constrained.
    #[must_use]
    pub fn from_adapter_info(
        info: &wgpu::AdapterInfo,
        downlevel: &wgpu::DownlevelCapabilities,
    ) -> Self {
        let compute = downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        let constrained = matches!(info.backend, wgpu::Backend::Gl)
            || (matches!(info.device_type, wgpu::DeviceType::IntegratedGpu) && !compute);

        Self {
            supports_compute_shaders: compute,
            use_structured_buffer: compute && !constrained,
            fast_attenuation: constrained,
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::desktop()
    }
}

// ---------------------------------------------------------------------------
// ClusterGridConfig
// ---------------------------------------------------------------------------

/// Shape and depth distribution of the clustered light grid.
///
/// The depth distribution constants must match the shading stage exactly;
/// changing them here without updating the shader breaks the slice lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterGridConfig {
    /// Screen tile edge length in pixels.
    pub tile_size: u32,

    /// Number of depth slices along the view direction.
    pub depth_slices: u32,

    /// Distance added to the camera near plane before the first slice.
    pub near_plane_offset: f32,

    /// Distribution scale `S` in `slice = log2(z * B + O) * S`.
    pub distribution_scale: f32,

    /// Far plane clamp; depth beyond this lands in the last slice.
    pub max_far_plane: f32,

    /// Per-cell attenuation constant on constrained platforms (`0.8² - 1`).
    pub fast_attenuation_constant: f32,

    /// Per-cell attenuation constant otherwise.
    pub precise_attenuation_constant: f32,
}

impl Default for ClusterGridConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            depth_slices: 32,
            near_plane_offset: 0.095,
            distribution_scale: 4.05,
            max_far_plane: 500.0,
            fast_attenuation_constant: -0.36,
            precise_attenuation_constant: 1.0,
        }
    }
}

impl ClusterGridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(LightingError::ZeroTileSize);
        }
        if self.depth_slices == 0 {
            return Err(LightingError::ZeroDepthSlices);
        }
        for (name, value) in [
            ("distribution_scale", self.distribution_scale),
            ("max_far_plane", self.max_far_plane),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LightingError::InvalidGridParameter { name, value });
            }
        }
        if !(self.near_plane_offset.is_finite() && self.near_plane_offset >= 0.0) {
            return Err(LightingError::InvalidGridParameter {
                name: "near_plane_offset",
                value: self.near_plane_offset,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LightingSettings
// ---------------------------------------------------------------------------

/// Static configuration for the light preparation core.
///
/// | Field                               | Default |
/// |-------------------------------------|---------|
/// | `max_visible_additional_lights`     | 32      |
/// | `max_per_cluster_additional_lights` | 32      |
/// | `cluster`                           | see [`ClusterGridConfig`] |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// Capacity of the additional light set. Visible lights past this count
    /// are dropped for the frame.
    pub max_visible_additional_lights: usize,

    /// Capacity of one cluster's light list.
    pub max_per_cluster_additional_lights: u32,

    pub cluster: ClusterGridConfig,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            max_visible_additional_lights: 32,
            max_per_cluster_additional_lights: 32,
            cluster: ClusterGridConfig::default(),
        }
    }
}

impl LightingSettings {
    /// Constrained platforms keep uniform arrays small.
    const CONSTRAINED_MAX_ADDITIONAL_LIGHTS: usize = 16;

    #[must_use]
    pub fn for_platform(caps: &PlatformCapabilities) -> Self {
        let mut settings = Self::default();
        if caps.fast_attenuation {
            settings.max_visible_additional_lights = Self::CONSTRAINED_MAX_ADDITIONAL_LIGHTS;
        }
        settings
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_visible_additional_lights == 0 {
            return Err(LightingError::ZeroAdditionalLightCapacity);
        }
        let per_cluster = self.max_per_cluster_additional_lights;
        if per_cluster == 0 || per_cluster % CLUSTER_INDEX_PACKING != 0 {
            return Err(LightingError::MisalignedClusterCapacity {
                value: per_cluster,
                alignment: CLUSTER_INDEX_PACKING,
            });
        }
        self.cluster.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clustered_falls_back_without_compute() {
        assert_eq!(
            AdditionalLightsMode::Clustered.resolve(false),
            AdditionalLightsMode::PerPixel
        );
        assert_eq!(
            AdditionalLightsMode::Clustered.resolve(true),
            AdditionalLightsMode::Clustered
        );
        assert_eq!(
            AdditionalLightsMode::PerVertex.resolve(false),
            AdditionalLightsMode::PerVertex
        );
    }

    #[test]
    fn default_settings_are_valid() {
        assert_eq!(LightingSettings::default().validate(), Ok(()));
    }

    #[test]
    fn cluster_capacity_must_be_packed() {
        let settings = LightingSettings {
            max_per_cluster_additional_lights: 30,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(LightingError::MisalignedClusterCapacity {
                value: 30,
                alignment: 4
            })
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        let settings = LightingSettings {
            max_visible_additional_lights: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(LightingError::ZeroAdditionalLightCapacity)
        );
    }

    #[test]
    fn invalid_grid_parameters_rejected() {
        let mut settings = LightingSettings::default();
        settings.cluster.tile_size = 0;
        assert_eq!(settings.validate(), Err(LightingError::ZeroTileSize));

        let mut settings = LightingSettings::default();
        settings.cluster.max_far_plane = -1.0;
        assert!(matches!(
            settings.validate(),
            Err(LightingError::InvalidGridParameter {
                name: "max_far_plane",
                ..
            })
        ));
    }

    #[test]
    fn mobile_settings_shrink_capacity() {
        let settings = LightingSettings::for_platform(&PlatformCapabilities::mobile());
        assert_eq!(settings.max_visible_additional_lights, 16);
        let settings = LightingSettings::for_platform(&PlatformCapabilities::desktop());
        assert_eq!(settings.max_visible_additional_lights, 32);
    }
}
