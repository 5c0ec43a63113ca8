//! Frame inputs handed over by the visibility subsystem.
//!
//! The culling subsystem owns the visible light list and the per-object light
//! index map. The light core borrows the map mutably once per frame, rewrites
//! it in place and hands it back before any per-object draw reads it.

use crate::renderer::buffer::{BufferAllocator, BufferHandle};
use crate::renderer::settings::{AdditionalLightsMode, LightingSettings};
use crate::scene::{CameraData, VisibleLight};

/// Culling-side state the light core reads and writes.
pub trait LightCulling {
    /// Raw per-object light index map, one entry per visible light.
    ///
    /// Single writer per frame: the light core mutates it before any
    /// per-object draw consults it. Remapping twice in one frame is not
    /// idempotent.
    fn light_index_map_mut(&mut self) -> &mut [i32];

    /// Length of the flattened per-object light and reflection probe index
    /// list.
    fn light_and_probe_index_count(&self) -> usize;

    /// Writes the flattened index list into `buffer`.
    fn fill_light_and_probe_indices(
        &mut self,
        allocator: &mut dyn BufferAllocator,
        buffer: BufferHandle,
    );
}

/// Plain-data culling results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CullingResults {
    pub light_index_map: Vec<i32>,
    pub light_and_probe_indices: Vec<u32>,
}

impl CullingResults {
    /// Identity map: light `i` is the `i`-th per-object light.
    #[must_use]
    pub fn with_identity_map(light_count: usize) -> Self {
        Self {
            light_index_map: (0..light_count as i32).collect(),
            light_and_probe_indices: Vec::new(),
        }
    }
}

impl LightCulling for CullingResults {
    fn light_index_map_mut(&mut self) -> &mut [i32] {
        &mut self.light_index_map
    }

    fn light_and_probe_index_count(&self) -> usize {
        self.light_and_probe_indices.len()
    }

    fn fill_light_and_probe_indices(
        &mut self,
        allocator: &mut dyn BufferAllocator,
        buffer: BufferHandle,
    ) {
        allocator.write_buffer(buffer, bytemuck::cast_slice(&self.light_and_probe_indices));
    }
}

/// Per-frame light configuration.
#[derive(Debug, Clone, Copy)]
pub struct LightData<'a> {
    pub visible_lights: &'a [VisibleLight],
    /// Index into `visible_lights`, `None` when there is no main light.
    pub main_light_index: Option<usize>,
    /// Number of additional lights the pipeline decided to shade.
    pub additional_lights_count: usize,
    pub max_per_object_additional_lights_count: u32,
    pub shade_additional_lights_mode: AdditionalLightsMode,
    pub supports_mixed_lighting: bool,
}

impl<'a> LightData<'a> {
    /// Default per-object light cap.
    pub const DEFAULT_MAX_PER_OBJECT_LIGHTS: u32 = 4;

    /// Counts every non-main visible light up to the configured capacity.
    #[must_use]
    pub fn new(
        visible_lights: &'a [VisibleLight],
        main_light_index: Option<usize>,
        mode: AdditionalLightsMode,
        settings: &LightingSettings,
    ) -> Self {
        let main = usize::from(main_light_index.is_some_and(|i| i < visible_lights.len()));
        Self {
            visible_lights,
            main_light_index,
            additional_lights_count: (visible_lights.len() - main)
                .min(settings.max_visible_additional_lights),
            max_per_object_additional_lights_count: Self::DEFAULT_MAX_PER_OBJECT_LIGHTS,
            shade_additional_lights_mode: mode,
            supports_mixed_lighting: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_main_light(&self, index: usize) -> bool {
        self.main_light_index == Some(index)
    }
}

/// Everything [`ForwardLights::setup`] reads for one frame.
///
/// [`ForwardLights::setup`]: crate::renderer::lights::ForwardLights::setup
pub struct RenderingData<'a> {
    pub camera: CameraData,
    pub lights: LightData<'a>,
    pub culling: &'a mut dyn LightCulling,
}
