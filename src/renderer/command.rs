//! GPU Submission Channel
//!
//! The light core never talks to a device directly. It writes named shader
//! parameters, keyword toggles and compute dispatches into a [`CommandSink`],
//! which the renderer replays on the device in submission order.
//!
//! [`CommandRecorder`] is an in-memory sink that keeps every command and the
//! last value written under each name; it backs the test suite and is handy
//! for frame debugging.

use bitflags::bitflags;
use glam::{UVec3, Vec4};
use rustc_hash::FxHashMap;

use crate::renderer::buffer::BufferHandle;

/// Shader-visible parameter names written by the light core.
pub mod shader_ids {
    pub const MAIN_LIGHT_POSITION: &str = "main_light_position";
    pub const MAIN_LIGHT_COLOR: &str = "main_light_color";

    pub const ADDITIONAL_LIGHTS_COUNT: &str = "additional_lights_count";
    pub const ADDITIONAL_LIGHTS_POSITION: &str = "additional_lights_position";
    pub const ADDITIONAL_LIGHTS_COLOR: &str = "additional_lights_color";
    pub const ADDITIONAL_LIGHTS_ATTENUATION: &str = "additional_lights_attenuation";
    pub const ADDITIONAL_LIGHTS_SPOT_DIR: &str = "additional_lights_spot_dir";
    pub const ADDITIONAL_LIGHTS_OCCLUSION_PROBES: &str = "additional_lights_occlusion_probes";

    pub const ADDITIONAL_LIGHTS_BUFFER: &str = "additional_lights_buffer";
    pub const ADDITIONAL_LIGHTS_INDICES: &str = "additional_lights_indices";

    pub const LIGHT_GRID_SIZE: &str = "light_grid_size";
    pub const LIGHT_GRID_Z_PARAMS: &str = "light_grid_z_params";
    pub const RW_NUM_CULLED_LIGHTS_GRID: &str = "rw_num_culled_lights_grid";
    pub const RW_CULLED_LIGHT_DATA_GRID: &str = "rw_culled_light_data_grid";
    pub const NUM_CULLED_LIGHTS_GRID: &str = "num_culled_lights_grid";
    pub const CULLED_LIGHT_DATA_GRID: &str = "culled_light_data_grid";
}

bitflags! {
    /// Shader keywords toggled by the light core every frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderKeywords: u32 {
        const ADDITIONAL_LIGHTS_VERTEX    = 1 << 0;
        const ADDITIONAL_LIGHTS_PIXEL     = 1 << 1;
        const ADDITIONAL_LIGHTS_CLUSTERED = 1 << 2;
        const MIXED_LIGHTING_SUBTRACTIVE  = 1 << 3;
    }
}

impl ShaderKeywords {
    /// Every keyword with the define name the shader generator uses for it.
    pub const NAMED: [(Self, &'static str); 4] = [
        (Self::ADDITIONAL_LIGHTS_VERTEX, "ADDITIONAL_LIGHTS_VERTEX"),
        (Self::ADDITIONAL_LIGHTS_PIXEL, "ADDITIONAL_LIGHTS"),
        (Self::ADDITIONAL_LIGHTS_CLUSTERED, "ADDITIONAL_LIGHTS_CLUSTERED"),
        (Self::MIXED_LIGHTING_SUBTRACTIVE, "MIXED_LIGHTING_SUBTRACTIVE"),
    ];

    #[must_use]
    pub fn define_name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, name)| *name)
    }
}

/// Handle to a compute kernel owned by the compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputeKernel {
    pub id: u64,
    pub entry: u32,
}

impl ComputeKernel {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id, entry: 0 }
    }
}

/// Fire-and-forget command stream towards the device.
///
/// Commands execute on the device in the order they were submitted. Nothing
/// is read back.
pub trait CommandSink {
    fn set_global_vector(&mut self, name: &'static str, value: Vec4);

    fn set_global_vector_array(&mut self, name: &'static str, values: &[Vec4]);

    fn set_global_buffer(&mut self, name: &'static str, buffer: BufferHandle);

    fn set_keyword(&mut self, keyword: ShaderKeywords, enabled: bool);

    fn set_compute_buffer(&mut self, kernel: ComputeKernel, name: &'static str, buffer: BufferHandle);

    fn dispatch_compute(&mut self, kernel: ComputeKernel, groups: UVec3);
}

/// One command as received by a [`CommandRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SetGlobalVector(&'static str, Vec4),
    SetGlobalVectorArray(&'static str, Vec<Vec4>),
    SetGlobalBuffer(&'static str, BufferHandle),
    SetKeyword(ShaderKeywords, bool),
    SetComputeBuffer(ComputeKernel, &'static str, BufferHandle),
    DispatchCompute(ComputeKernel, UVec3),
}

/// Sink that records commands and tracks the resulting global state.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<RenderCommand>,
    vectors: FxHashMap<&'static str, Vec4>,
    vector_arrays: FxHashMap<&'static str, Vec<Vec4>>,
    buffers: FxHashMap<&'static str, BufferHandle>,
    keywords: ShaderKeywords,
}

impl CommandRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Drops recorded commands; global state is kept, as on a device.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    #[must_use]
    pub fn vector(&self, name: &str) -> Option<Vec4> {
        self.vectors.get(name).copied()
    }

    #[must_use]
    pub fn vector_array(&self, name: &str) -> Option<&[Vec4]> {
        self.vector_arrays.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<BufferHandle> {
        self.buffers.get(name).copied()
    }

    #[must_use]
    pub fn keywords(&self) -> ShaderKeywords {
        self.keywords
    }

    #[must_use]
    pub fn dispatches(&self) -> Vec<UVec3> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                RenderCommand::DispatchCompute(_, groups) => Some(*groups),
                _ => None,
            })
            .collect()
    }
}

impl CommandSink for CommandRecorder {
    fn set_global_vector(&mut self, name: &'static str, value: Vec4) {
        self.vectors.insert(name, value);
        self.commands.push(RenderCommand::SetGlobalVector(name, value));
    }

    fn set_global_vector_array(&mut self, name: &'static str, values: &[Vec4]) {
        self.vector_arrays.insert(name, values.to_vec());
        self.commands
            .push(RenderCommand::SetGlobalVectorArray(name, values.to_vec()));
    }

    fn set_global_buffer(&mut self, name: &'static str, buffer: BufferHandle) {
        self.buffers.insert(name, buffer);
        self.commands.push(RenderCommand::SetGlobalBuffer(name, buffer));
    }

    fn set_keyword(&mut self, keyword: ShaderKeywords, enabled: bool) {
        self.keywords.set(keyword, enabled);
        self.commands.push(RenderCommand::SetKeyword(keyword, enabled));
    }

    fn set_compute_buffer(&mut self, kernel: ComputeKernel, name: &'static str, buffer: BufferHandle) {
        self.commands
            .push(RenderCommand::SetComputeBuffer(kernel, name, buffer));
    }

    fn dispatch_compute(&mut self, kernel: ComputeKernel, groups: UVec3) {
        self.commands.push(RenderCommand::DispatchCompute(kernel, groups));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_define_names() {
        assert_eq!(
            ShaderKeywords::ADDITIONAL_LIGHTS_PIXEL.define_name(),
            Some("ADDITIONAL_LIGHTS")
        );
        assert_eq!(
            (ShaderKeywords::ADDITIONAL_LIGHTS_PIXEL | ShaderKeywords::ADDITIONAL_LIGHTS_VERTEX)
                .define_name(),
            None
        );
    }

    #[test]
    fn recorder_tracks_last_value() {
        let mut rec = CommandRecorder::new();
        rec.set_global_vector(shader_ids::MAIN_LIGHT_COLOR, Vec4::ONE);
        rec.set_global_vector(shader_ids::MAIN_LIGHT_COLOR, Vec4::ZERO);
        rec.set_keyword(ShaderKeywords::MIXED_LIGHTING_SUBTRACTIVE, true);

        assert_eq!(rec.vector(shader_ids::MAIN_LIGHT_COLOR), Some(Vec4::ZERO));
        assert_eq!(rec.commands().len(), 3);
        assert!(rec.keywords().contains(ShaderKeywords::MIXED_LIGHTING_SUBTRACTIVE));

        rec.clear_commands();
        assert!(rec.commands().is_empty());
        assert_eq!(rec.vector(shader_ids::MAIN_LIGHT_COLOR), Some(Vec4::ZERO));
    }
}
