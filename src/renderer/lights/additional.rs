//! Main / additional light partitioning
//!
//! Every visible light except the main light is an additional light. They
//! are packed in visibility order into one of two layouts, picked once from
//! the platform capabilities:
//!
//! - [`UniformLightArrays`]: five fixed-capacity `vec4` arrays, one per
//!   record field, indexed by additional light slot.
//! - [`StructuredLightBuffers`]: one record buffer plus the flattened
//!   per-object light index buffer filled by the culling subsystem.
//!
//! Lights past the capacity are dropped for the frame.

use glam::Vec4;

use super::attenuation::{FrameLightingContext, pack_light};
use crate::renderer::buffer::{BufferAllocator, BufferDesc, BufferHandle};
use crate::renderer::command::{CommandSink, shader_ids};
use crate::renderer::culling::LightData;
use crate::resources::uniforms::PackedLightRecord;

/// Producer interface shared by both additional light layouts.
pub trait AdditionalLightsLayout {
    /// Maximum number of additional lights per frame.
    fn capacity(&self) -> usize;

    /// Prepares for `count` lights this frame.
    fn begin(&mut self, count: usize);

    /// Stores the record for additional light `slot`. Slots arrive in order.
    fn write(&mut self, slot: usize, record: &PackedLightRecord);

    /// Uploads and binds the first `count` lights.
    fn submit(
        &mut self,
        count: usize,
        light_index_count: usize,
        sink: &mut dyn CommandSink,
        allocator: &mut dyn BufferAllocator,
    );
}

// ============================================================================
// Uniform arrays
// ============================================================================

/// Scratch arrays reused every frame. Slots past this frame's count keep
/// stale data; the shader never reads past the count.
#[derive(Debug, Clone)]
pub struct UniformLightArrays {
    pub positions: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub attenuations: Vec<Vec4>,
    pub spot_directions: Vec<Vec4>,
    pub occlusion_probe_channels: Vec<Vec4>,
}

impl UniformLightArrays {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: vec![Vec4::ZERO; capacity],
            colors: vec![Vec4::ZERO; capacity],
            attenuations: vec![Vec4::ZERO; capacity],
            spot_directions: vec![Vec4::ZERO; capacity],
            occlusion_probe_channels: vec![Vec4::ZERO; capacity],
        }
    }
}

impl AdditionalLightsLayout for UniformLightArrays {
    fn capacity(&self) -> usize {
        self.positions.len()
    }

    fn begin(&mut self, _count: usize) {}

    fn write(&mut self, slot: usize, record: &PackedLightRecord) {
        self.positions[slot] = record.position;
        self.colors[slot] = record.color;
        self.attenuations[slot] = record.attenuation;
        self.spot_directions[slot] = record.spot_direction;
        self.occlusion_probe_channels[slot] = record.occlusion_probe_channels;
    }

    fn submit(
        &mut self,
        _count: usize,
        _light_index_count: usize,
        sink: &mut dyn CommandSink,
        _allocator: &mut dyn BufferAllocator,
    ) {
        sink.set_global_vector_array(shader_ids::ADDITIONAL_LIGHTS_POSITION, &self.positions);
        sink.set_global_vector_array(shader_ids::ADDITIONAL_LIGHTS_COLOR, &self.colors);
        sink.set_global_vector_array(shader_ids::ADDITIONAL_LIGHTS_ATTENUATION, &self.attenuations);
        sink.set_global_vector_array(shader_ids::ADDITIONAL_LIGHTS_SPOT_DIR, &self.spot_directions);
        sink.set_global_vector_array(
            shader_ids::ADDITIONAL_LIGHTS_OCCLUSION_PROBES,
            &self.occlusion_probe_channels,
        );
    }
}

// ============================================================================
// Structured buffers
// ============================================================================

/// A device buffer that only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowableBuffer {
    pub handle: BufferHandle,
    pub count: usize,
}

impl GrowableBuffer {
    /// Returns a buffer holding at least `count` elements, replacing `slot`'s
    /// buffer when it is missing or too small.
    pub fn ensure(
        slot: &mut Option<Self>,
        allocator: &mut dyn BufferAllocator,
        label: &'static str,
        count: usize,
        stride: usize,
    ) -> BufferHandle {
        match slot {
            Some(buffer) if buffer.count >= count => buffer.handle,
            _ => {
                if let Some(old) = slot.take() {
                    allocator.release_buffer(old.handle);
                }
                log::debug!("Allocating {label} for {count} elements");
                let handle = allocator.create_buffer(&BufferDesc::storage(label, count, stride));
                *slot = Some(Self { handle, count });
                handle
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructuredLightBuffers {
    capacity: usize,
    records: Vec<PackedLightRecord>,
    light_data: Option<GrowableBuffer>,
    light_indices: Option<GrowableBuffer>,
}

impl StructuredLightBuffers {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
            light_data: None,
            light_indices: None,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[PackedLightRecord] {
        &self.records
    }

    pub fn release(&mut self, allocator: &mut dyn BufferAllocator) {
        for buffer in [self.light_data.take(), self.light_indices.take()].into_iter().flatten() {
            allocator.release_buffer(buffer.handle);
        }
    }

    #[must_use]
    pub fn light_data_buffer(&self) -> Option<GrowableBuffer> {
        self.light_data
    }

    /// Buffer receiving the culling subsystem's flattened light indices.
    pub fn light_indices_buffer(
        &mut self,
        allocator: &mut dyn BufferAllocator,
        count: usize,
    ) -> BufferHandle {
        GrowableBuffer::ensure(
            &mut self.light_indices,
            allocator,
            "Additional Light Indices",
            count,
            size_of::<u32>(),
        )
    }
}

impl AdditionalLightsLayout for StructuredLightBuffers {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn begin(&mut self, count: usize) {
        self.records.clear();
        self.records.reserve(count);
    }

    fn write(&mut self, slot: usize, record: &PackedLightRecord) {
        debug_assert_eq!(slot, self.records.len());
        self.records.push(*record);
    }

    fn submit(
        &mut self,
        count: usize,
        light_index_count: usize,
        sink: &mut dyn CommandSink,
        allocator: &mut dyn BufferAllocator,
    ) {
        let count = count.min(self.records.len());
        let light_data = GrowableBuffer::ensure(
            &mut self.light_data,
            allocator,
            "Additional Light Data",
            count,
            size_of::<PackedLightRecord>(),
        );
        allocator.write_buffer(light_data, bytemuck::cast_slice(&self.records[..count]));

        let light_indices = self.light_indices_buffer(allocator, light_index_count);

        sink.set_global_buffer(shader_ids::ADDITIONAL_LIGHTS_BUFFER, light_data);
        sink.set_global_buffer(shader_ids::ADDITIONAL_LIGHTS_INDICES, light_indices);
    }
}

// ============================================================================
// Layout selection
// ============================================================================

/// The additional light layout, chosen once at construction.
#[derive(Debug, Clone)]
pub enum AdditionalLightSet {
    UniformArrays(UniformLightArrays),
    StructuredBuffer(StructuredLightBuffers),
}

impl AdditionalLightSet {
    #[must_use]
    pub fn new(use_structured_buffer: bool, capacity: usize) -> Self {
        if use_structured_buffer {
            Self::StructuredBuffer(StructuredLightBuffers::new(capacity))
        } else {
            Self::UniformArrays(UniformLightArrays::new(capacity))
        }
    }

    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::StructuredBuffer(_))
    }

    pub fn layout_mut(&mut self) -> &mut dyn AdditionalLightsLayout {
        match self {
            Self::UniformArrays(arrays) => arrays,
            Self::StructuredBuffer(buffers) => buffers,
        }
    }

    /// Releases device buffers; only the structured layout owns any.
    pub fn release(&mut self, allocator: &mut dyn BufferAllocator) {
        if let Self::StructuredBuffer(buffers) = self {
            buffers.release(allocator);
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::UniformArrays(arrays) => arrays.capacity(),
            Self::StructuredBuffer(buffers) => buffers.capacity(),
        }
    }
}

// ============================================================================
// Partitioning
// ============================================================================

/// Packs every non-main visible light into `layout`, in visibility order,
/// until the layout is full. Returns the number of lights written.
pub fn pack_additional_lights(
    lights: &LightData<'_>,
    layout: &mut dyn AdditionalLightsLayout,
    fast_attenuation: bool,
    ctx: &mut FrameLightingContext,
) -> usize {
    let capacity = layout.capacity();
    let mut slot = 0;
    for (i, light) in lights.visible_lights.iter().enumerate() {
        if slot >= capacity {
            break;
        }
        if lights.is_main_light(i) {
            continue;
        }
        layout.write(slot, &pack_light(light, false, fast_attenuation, ctx));
        slot += 1;
    }
    slot
}

/// `(per-object cap, additional count, per-cluster cap, 0)`, or zero when
/// there are no additional lights. The count never exceeds `kept`, the number
/// of lights actually uploaded.
#[must_use]
pub fn additional_lights_count_vector(
    lights: &LightData<'_>,
    kept: usize,
    max_per_cluster: u32,
) -> Vec4 {
    if kept == 0 {
        return Vec4::ZERO;
    }
    Vec4::new(
        lights.max_per_object_additional_lights_count as f32,
        lights.additional_lights_count.min(kept) as f32,
        max_per_cluster as f32,
        0.0,
    )
}
