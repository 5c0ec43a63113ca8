//! Forward Lights
//!
//! Prepares the per-frame lighting constants for the forward shading path.
//!
//! # Frame Flow
//!
//! ```text
//! reset frame context
//!   → main light constants
//!   → per-object index remap → additional light constants
//!   → shading mode keywords
//!   → light grid build (clustered mode only)
//! ```
//!
//! The order is fixed: the grid build reads the additional light data
//! submitted just before it.
//!
//! # Components
//!
//! - [`attenuation`]: light → [`PackedLightRecord`] conversion
//! - [`additional`]: main / additional partition and the two upload layouts
//! - [`per_object`]: per-object light index remapping
//! - [`cluster`]: light grid sizing, depth distribution and buffer lifetime
//!
//! [`PackedLightRecord`]: crate::resources::uniforms::PackedLightRecord

pub mod additional;
pub mod attenuation;
pub mod cluster;
pub mod per_object;

use crate::errors::Result;
use crate::renderer::buffer::BufferAllocator;
use crate::renderer::command::{CommandSink, ComputeKernel, ShaderKeywords, shader_ids};
use crate::renderer::culling::{LightData, RenderingData};
use crate::renderer::settings::{AdditionalLightsMode, LightingSettings, PlatformCapabilities};
use crate::resources::uniforms::LightGridParams;

use additional::{AdditionalLightSet, additional_lights_count_vector, pack_additional_lights};
use attenuation::{FrameLightingContext, MixedLightingSetup, pack_main_light};
use cluster::ClusterGrid;
use per_object::setup_per_object_light_indices;

/// What one [`ForwardLights::setup`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLightingSummary {
    /// Shading mode actually used; differs from the requested one when the
    /// clustered path fell back to per-pixel.
    pub mode: AdditionalLightsMode,
    /// Additional lights kept after remapping.
    pub additional_lights: usize,
    pub mixed_lighting: MixedLightingSetup,
    /// Set when the light grid was built this frame.
    pub light_grid: Option<LightGridParams>,
}

/// Computes and submits lighting data to the GPU.
///
/// One instance serves one frame at a time: the frame context and the
/// uniform array scratch space are mutated in place during [`setup`].
///
/// [`setup`]: Self::setup
pub struct ForwardLights {
    settings: LightingSettings,
    capabilities: PlatformCapabilities,
    frame: FrameLightingContext,
    additional: AdditionalLightSet,
    cluster_grid: ClusterGrid,
}

impl ForwardLights {
    pub fn new(settings: LightingSettings, capabilities: PlatformCapabilities) -> Result<Self> {
        settings.validate()?;
        let additional = AdditionalLightSet::new(
            capabilities.use_structured_buffer,
            settings.max_visible_additional_lights,
        );
        let cluster_grid = ClusterGrid::new(settings.cluster);

        Ok(Self {
            settings,
            capabilities,
            frame: FrameLightingContext::default(),
            additional,
            cluster_grid,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &LightingSettings {
        &self.settings
    }

    #[must_use]
    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn additional_lights(&self) -> &AdditionalLightSet {
        &self.additional
    }

    #[must_use]
    pub fn cluster_grid(&self) -> &ClusterGrid {
        &self.cluster_grid
    }

    /// Prepares lighting for one frame.
    ///
    /// `light_grid_compute` is the grid culling kernel; without it (or
    /// without compute support) a clustered request is shaded per-pixel.
    pub fn setup(
        &mut self,
        data: &mut RenderingData<'_>,
        sink: &mut dyn CommandSink,
        allocator: &mut dyn BufferAllocator,
        light_grid_compute: Option<ComputeKernel>,
    ) -> FrameLightingSummary {
        let kernel = light_grid_compute.filter(|_| self.capabilities.supports_compute_shaders);
        let mode = data
            .lights
            .shade_additional_lights_mode
            .resolve(kernel.is_some());

        self.frame.reset();
        self.setup_main_light_constants(&data.lights, sink);
        let additional_lights = self.setup_additional_light_constants(data, sink, allocator);

        let has_additional = data.lights.additional_lights_count > 0;
        sink.set_keyword(
            ShaderKeywords::ADDITIONAL_LIGHTS_VERTEX,
            has_additional && mode == AdditionalLightsMode::PerVertex,
        );
        sink.set_keyword(
            ShaderKeywords::ADDITIONAL_LIGHTS_PIXEL,
            has_additional && mode == AdditionalLightsMode::PerPixel,
        );
        sink.set_keyword(
            ShaderKeywords::ADDITIONAL_LIGHTS_CLUSTERED,
            has_additional && mode == AdditionalLightsMode::Clustered,
        );
        sink.set_keyword(
            ShaderKeywords::MIXED_LIGHTING_SUBTRACTIVE,
            data.lights.supports_mixed_lighting
                && self.frame.mixed_lighting == MixedLightingSetup::Subtractive,
        );

        let light_grid = match (mode, kernel) {
            (AdditionalLightsMode::Clustered, Some(kernel)) => Some(self.cluster_grid.dispatch(
                sink,
                allocator,
                kernel,
                &data.camera,
                self.settings.max_per_cluster_additional_lights,
                self.capabilities.fast_attenuation,
            )),
            _ => None,
        };

        log::trace!(
            "Forward lights: mode {mode:?}, {additional_lights} additional, mixed {:?}",
            self.frame.mixed_lighting
        );

        FrameLightingSummary {
            mode,
            additional_lights,
            mixed_lighting: self.frame.mixed_lighting,
            light_grid,
        }
    }

    /// Releases device buffers held across frames.
    pub fn release(&mut self, allocator: &mut dyn BufferAllocator) {
        self.cluster_grid.release(allocator);
        self.additional.release(allocator);
    }

    fn setup_main_light_constants(&mut self, lights: &LightData<'_>, sink: &mut dyn CommandSink) {
        let record = pack_main_light(
            lights.visible_lights,
            lights.main_light_index,
            self.capabilities.fast_attenuation,
            &mut self.frame,
        );
        sink.set_global_vector(shader_ids::MAIN_LIGHT_POSITION, record.position);
        sink.set_global_vector(shader_ids::MAIN_LIGHT_COLOR, record.color);
    }

    fn setup_additional_light_constants(
        &mut self,
        data: &mut RenderingData<'_>,
        sink: &mut dyn CommandSink,
        allocator: &mut dyn BufferAllocator,
    ) -> usize {
        let lights = data.lights;
        let kept = setup_per_object_light_indices(
            &lights,
            data.culling,
            &mut self.additional,
            allocator,
            self.settings.max_visible_additional_lights,
        );

        if kept > 0 {
            let light_index_count = data.culling.light_and_probe_index_count();
            let layout = self.additional.layout_mut();
            layout.begin(kept);
            let written = pack_additional_lights(
                &lights,
                layout,
                self.capabilities.fast_attenuation,
                &mut self.frame,
            );
            layout.submit(written, light_index_count, sink, allocator);
        }

        sink.set_global_vector(
            shader_ids::ADDITIONAL_LIGHTS_COUNT,
            additional_lights_count_vector(
                &lights,
                kept,
                self.settings.max_per_cluster_additional_lights,
            ),
        );

        kept
    }
}
