//! Clustered light grid
//!
//! Splits the view frustum into screen tiles × depth slices. A compute pass
//! writes, per cell, the number of lights touching it and their packed
//! indices; the fragment stage finds its cell and walks that list.
//!
//! Depth slices are distributed logarithmically:
//!
//! ```text
//! slice = log2(z * B + O) * S
//! ```
//!
//! `S` is a fixed distribution scale. `B` and `O` are solved so the first
//! slice starts at `near + offset` and slice `slices` lands on the clamped far
//! plane. The fragment stage evaluates the same formula from
//! [`LightGridParams::z_params`].

use glam::{UVec3, Vec4};

use crate::renderer::buffer::{BufferAllocator, BufferDesc, BufferHandle};
use crate::renderer::command::{CommandSink, ComputeKernel, shader_ids};
use crate::renderer::settings::{CLUSTER_INDEX_PACKING, ClusterGridConfig};
use crate::resources::uniforms::LightGridParams;
use crate::scene::CameraData;

/// Cells per thread group along each axis.
pub const CLUSTER_GROUP_SIZE: u32 = 4;

/// Smallest depth span the grid covers when the far plane collapses onto the
/// offset near plane.
const MIN_GRID_DEPTH: f32 = 0.01;

/// Tiles × tiles × slices for a viewport.
#[must_use]
pub fn light_grid_size(camera: &CameraData, config: &ClusterGridConfig) -> UVec3 {
    UVec3::new(
        camera.pixel_width.div_ceil(config.tile_size),
        camera.pixel_height.div_ceil(config.tile_size),
        config.depth_slices,
    )
}

/// Solves `(B, O, S, near)` for the depth slice distribution.
#[must_use]
pub fn light_grid_z_params(
    near_plane: f32,
    far_plane: f32,
    slices: u32,
    config: &ClusterGridConfig,
) -> Vec4 {
    let s = config.distribution_scale;
    let n = near_plane + config.near_plane_offset;
    let f = far_plane.min(config.max_far_plane).max(n + MIN_GRID_DEPTH);

    let o = (f - n * (slices as f32 / s).exp2()) / (f - n);
    let b = (1.0 - o) / n;

    Vec4::new(b, o, s, near_plane)
}

/// Fractional slice for view-space depth `z`, as the fragment stage computes it.
#[must_use]
pub fn depth_slice(z: f32, z_params: Vec4) -> f32 {
    (z * z_params.x + z_params.y).log2() * z_params.z
}

/// Number of grid cells, computed in `usize`.
#[must_use]
pub fn cell_count(grid_size: UVec3) -> usize {
    grid_size.x as usize * grid_size.y as usize * grid_size.z as usize
}

/// Thread groups for one grid build.
#[must_use]
pub fn dispatch_groups(grid_size: UVec3) -> UVec3 {
    UVec3::new(
        grid_size.x.div_ceil(CLUSTER_GROUP_SIZE),
        grid_size.y.div_ceil(CLUSTER_GROUP_SIZE),
        grid_size.z.div_ceil(CLUSTER_GROUP_SIZE),
    )
}

/// The two per-cell buffers, sized for `cell_count` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterBuffers {
    /// One `u32` light count per cell.
    pub num_culled_lights: BufferHandle,
    /// Packed light indices, four per `u32`, `max_per_cluster` per cell.
    pub culled_light_data: BufferHandle,
    pub cell_count: usize,
}

impl ClusterBuffers {
    fn allocate(allocator: &mut dyn BufferAllocator, cell_count: usize, max_per_cluster: u32) -> Self {
        let packed = cell_count * max_per_cluster as usize / CLUSTER_INDEX_PACKING as usize;
        Self {
            num_culled_lights: allocator.create_buffer(&BufferDesc::storage(
                "Num Culled Lights Grid",
                cell_count,
                size_of::<u32>(),
            )),
            culled_light_data: allocator.create_buffer(&BufferDesc::storage(
                "Culled Light Data Grid",
                packed,
                size_of::<u32>(),
            )),
            cell_count,
        }
    }

    fn release(self, allocator: &mut dyn BufferAllocator) {
        allocator.release_buffer(self.num_culled_lights);
        allocator.release_buffer(self.culled_light_data);
    }
}

/// Owns the cluster buffers across frames.
///
/// Buffers are allocated lazily and replaced only when the cell count
/// changes. The old pair is released before the new pair is created.
#[derive(Debug, Clone)]
pub struct ClusterGrid {
    config: ClusterGridConfig,
    buffers: Option<ClusterBuffers>,
}

impl ClusterGrid {
    #[must_use]
    pub fn new(config: ClusterGridConfig) -> Self {
        Self {
            config,
            buffers: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    #[must_use]
    pub fn buffers(&self) -> Option<ClusterBuffers> {
        self.buffers
    }

    /// Grid size and depth mapping for this frame's camera.
    #[must_use]
    pub fn params(&self, camera: &CameraData, fast_attenuation: bool) -> LightGridParams {
        let size = light_grid_size(camera, &self.config);
        let attenuation_constant = if fast_attenuation {
            self.config.fast_attenuation_constant
        } else {
            self.config.precise_attenuation_constant
        };

        LightGridParams {
            grid_size: size.as_vec3().extend(attenuation_constant),
            z_params: light_grid_z_params(camera.near, camera.far, size.z, &self.config),
        }
    }

    /// Returns buffers for `cell_count` cells, reusing the current pair when
    /// the count is unchanged.
    pub fn acquire_buffers(
        &mut self,
        allocator: &mut dyn BufferAllocator,
        cell_count: usize,
        max_per_cluster: u32,
    ) -> ClusterBuffers {
        match self.buffers {
            Some(buffers) if buffers.cell_count == cell_count => buffers,
            previous => {
                if let Some(old) = previous {
                    old.release(allocator);
                }
                log::debug!(
                    "Allocating light grid buffers: {cell_count} cells, {max_per_cluster} lights per cell"
                );
                let buffers = ClusterBuffers::allocate(allocator, cell_count, max_per_cluster);
                self.buffers = Some(buffers);
                buffers
            }
        }
    }

    /// Builds the grid on the device for this frame.
    ///
    /// Publishes the grid parameters, binds both buffers for writing,
    /// dispatches the culling kernel and rebinds the buffers for reading.
    pub fn dispatch(
        &mut self,
        sink: &mut dyn CommandSink,
        allocator: &mut dyn BufferAllocator,
        kernel: ComputeKernel,
        camera: &CameraData,
        max_per_cluster: u32,
        fast_attenuation: bool,
    ) -> LightGridParams {
        let params = self.params(camera, fast_attenuation);
        let size = light_grid_size(camera, &self.config);
        let buffers = self.acquire_buffers(allocator, cell_count(size), max_per_cluster);

        sink.set_global_vector(shader_ids::LIGHT_GRID_SIZE, params.grid_size);
        sink.set_compute_buffer(kernel, shader_ids::RW_NUM_CULLED_LIGHTS_GRID, buffers.num_culled_lights);
        sink.set_compute_buffer(kernel, shader_ids::RW_CULLED_LIGHT_DATA_GRID, buffers.culled_light_data);
        sink.set_global_vector(shader_ids::LIGHT_GRID_Z_PARAMS, params.z_params);
        sink.dispatch_compute(kernel, dispatch_groups(size));
        sink.set_global_buffer(shader_ids::NUM_CULLED_LIGHTS_GRID, buffers.num_culled_lights);
        sink.set_global_buffer(shader_ids::CULLED_LIGHT_DATA_GRID, buffers.culled_light_data);

        params
    }

    /// Releases the buffers, e.g. when the renderer shuts down.
    pub fn release(&mut self, allocator: &mut dyn BufferAllocator) {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(allocator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_rounds_up() {
        let config = ClusterGridConfig::default();
        let size = light_grid_size(&CameraData::new(1281, 64, 0.1, 100.0), &config);
        assert_eq!(size, UVec3::new(21, 1, 32));
    }

    #[test]
    fn dispatch_groups_round_up() {
        assert_eq!(dispatch_groups(UVec3::new(20, 12, 32)), UVec3::new(5, 3, 8));
        assert_eq!(dispatch_groups(UVec3::new(21, 1, 32)), UVec3::new(6, 1, 8));
    }

    #[test]
    fn cell_count_matches_grid() {
        assert_eq!(cell_count(UVec3::new(20, 12, 32)), 7680);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn cell_count_widens_before_multiplying() {
        assert_eq!(cell_count(UVec3::new(200_000, 100_000, 32)), 640_000_000_000);
    }

    #[test]
    fn slices_are_denser_near_the_camera() {
        let config = ClusterGridConfig::default();
        let z = light_grid_z_params(0.3, 1000.0, 32, &config);
        let near_span = depth_slice(2.0, z) - depth_slice(1.0, z);
        let far_span = depth_slice(101.0, z) - depth_slice(100.0, z);
        assert!(near_span > far_span);
    }

    #[test]
    fn collapsed_far_plane_stays_finite() {
        let config = ClusterGridConfig::default();
        let z = light_grid_z_params(1.0, 1.0, 32, &config);
        assert!(z.x.is_finite() && z.y.is_finite());
    }
}
