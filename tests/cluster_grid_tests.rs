//! Clustered Light Grid Tests
//!
//! Tests for:
//! - Grid sizing from viewport dimensions
//! - Logarithmic depth slice distribution end points
//! - Cluster buffer reuse and reallocation
//! - Dispatch command sequence

use glam::{UVec3, Vec4};

use forward_lights::renderer::command::{RenderCommand, shader_ids};
use forward_lights::renderer::lights::cluster::{
    ClusterGrid, depth_slice, light_grid_size, light_grid_z_params,
};
use forward_lights::{
    BufferAllocator, CameraData, ClusterGridConfig, CommandRecorder, ComputeKernel,
    HeadlessAllocator,
};

const KERNEL: ComputeKernel = ComputeKernel::new(7);

// ============================================================================
// Grid sizing
// ============================================================================

#[test]
fn grid_size_for_720p() {
    let size = light_grid_size(
        &CameraData::new(1280, 720, 0.1, 100.0),
        &ClusterGridConfig::default(),
    );
    assert_eq!(size, UVec3::new(20, 12, 32));
}

#[test]
fn grid_size_single_pixel() {
    let size = light_grid_size(&CameraData::new(1, 1, 0.1, 100.0), &ClusterGridConfig::default());
    assert_eq!(size, UVec3::new(1, 1, 32));
}

// ============================================================================
// Depth distribution
// ============================================================================

#[test]
fn depth_mapping_hits_first_and_last_slice() {
    let config = ClusterGridConfig::default();
    for (near, far) in [(0.1, 100.0), (0.3, 1000.0), (1.0, 50.0), (0.01, 499.0), (5.0, 5000.0)] {
        let z = light_grid_z_params(near, far, 32, &config);

        let first = depth_slice(near + config.near_plane_offset, z);
        let last = depth_slice(f32::min(far, config.max_far_plane), z);
        assert!(first.abs() < 1e-3, "near {near} far {far}: first slice {first}");
        assert!((last - 32.0).abs() < 1e-2, "near {near} far {far}: last slice {last}");
    }
}

#[test]
fn depth_params_carry_scale_and_near() {
    let z = light_grid_z_params(0.25, 300.0, 32, &ClusterGridConfig::default());
    assert_eq!(z.z, 4.05);
    assert_eq!(z.w, 0.25);
}

#[test]
fn depth_beyond_max_far_lands_past_last_slice() {
    let config = ClusterGridConfig::default();
    let z = light_grid_z_params(0.1, 2000.0, 32, &config);
    assert!(depth_slice(1500.0, z) > 32.0);
}

// ============================================================================
// Buffer lifetime
// ============================================================================

#[test]
fn buffers_reused_for_same_viewport() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();
    let camera = CameraData::new(1280, 720, 0.1, 100.0);

    grid.dispatch(&mut rec, &mut alloc, KERNEL, &camera, 32, false);
    let first = grid.buffers().expect("buffers allocated");
    grid.dispatch(&mut rec, &mut alloc, KERNEL, &camera, 32, false);
    let second = grid.buffers().expect("buffers allocated");

    assert_eq!(first, second);
    assert_eq!(alloc.created_count(), 2);
}

#[test]
fn buffers_reused_when_only_clip_planes_change() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(800, 600, 0.1, 100.0), 32, false);
    let first = grid.buffers();
    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(800, 600, 1.0, 20.0), 32, false);

    assert_eq!(grid.buffers(), first);
}

#[test]
fn buffers_recreated_on_resize() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(1280, 720, 0.1, 100.0), 32, false);
    let before = grid.buffers().expect("buffers allocated");
    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(1920, 1080, 0.1, 100.0), 32, false);
    let after = grid.buffers().expect("buffers allocated");

    assert_ne!(before.num_culled_lights, after.num_culled_lights);
    assert_ne!(before.culled_light_data, after.culled_light_data);
    assert!(!alloc.is_live(before.num_culled_lights));
    assert!(!alloc.is_live(before.culled_light_data));
    assert_eq!(alloc.live_count(), 2);
}

#[test]
fn resize_with_same_cell_count_keeps_buffers() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    // 20×12 tiles either way
    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(1280, 720, 0.1, 100.0), 32, false);
    let before = grid.buffers();
    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(1250, 705, 0.1, 100.0), 32, false);
    assert_eq!(grid.buffers(), before);
}

#[test]
fn buffer_sizes_follow_cell_count() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::new(1280, 720, 0.1, 100.0), 32, false);
    let buffers = grid.buffers().expect("buffers allocated");
    let cells = 20 * 12 * 32;
    assert_eq!(buffers.cell_count, cells);

    let counts = alloc.get(buffers.num_culled_lights).expect("live");
    assert_eq!(counts.desc.count, cells);
    assert_eq!(counts.desc.stride, 4);

    let indices = alloc.get(buffers.culled_light_data).expect("live");
    assert_eq!(indices.desc.count, cells * 32 / 4);
    assert_eq!(indices.desc.count * 4 % cells, 0);
}

#[test]
fn release_frees_buffers() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    grid.dispatch(&mut rec, &mut alloc, KERNEL, &CameraData::default(), 32, false);
    grid.release(&mut alloc);
    assert_eq!(alloc.live_count(), 0);
    assert!(grid.buffers().is_none());
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn dispatch_sequence() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let mut rec = CommandRecorder::new();

    let params = grid.dispatch(
        &mut rec,
        &mut alloc,
        KERNEL,
        &CameraData::new(1280, 720, 0.1, 100.0),
        32,
        true,
    );
    let buffers = grid.buffers().expect("buffers allocated");

    assert_eq!(params.grid_size, Vec4::new(20.0, 12.0, 32.0, -0.36));
    assert_eq!(
        rec.commands(),
        &[
            RenderCommand::SetGlobalVector(shader_ids::LIGHT_GRID_SIZE, params.grid_size),
            RenderCommand::SetComputeBuffer(
                KERNEL,
                shader_ids::RW_NUM_CULLED_LIGHTS_GRID,
                buffers.num_culled_lights
            ),
            RenderCommand::SetComputeBuffer(
                KERNEL,
                shader_ids::RW_CULLED_LIGHT_DATA_GRID,
                buffers.culled_light_data
            ),
            RenderCommand::SetGlobalVector(shader_ids::LIGHT_GRID_Z_PARAMS, params.z_params),
            RenderCommand::DispatchCompute(KERNEL, UVec3::new(5, 3, 8)),
            RenderCommand::SetGlobalBuffer(shader_ids::NUM_CULLED_LIGHTS_GRID, buffers.num_culled_lights),
            RenderCommand::SetGlobalBuffer(shader_ids::CULLED_LIGHT_DATA_GRID, buffers.culled_light_data),
        ][..]
    );
}

#[test]
fn precise_platforms_use_unit_attenuation_constant() {
    let grid = ClusterGrid::new(ClusterGridConfig::default());
    let params = grid.params(&CameraData::default(), false);
    assert_eq!(params.grid_size.w, 1.0);
}

#[test]
fn acquire_through_trait_object() {
    let mut grid = ClusterGrid::new(ClusterGridConfig::default());
    let mut alloc = HeadlessAllocator::new();
    let allocator: &mut dyn BufferAllocator = &mut alloc;
    let a = grid.acquire_buffers(allocator, 100, 8);
    let b = grid.acquire_buffers(allocator, 100, 8);
    assert_eq!(a, b);
}
