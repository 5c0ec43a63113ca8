//! Per-object light index remapping
//!
//! The culling subsystem assigns each visible light a per-object index that
//! still counts the main light. The main light is shaded globally, so its
//! entry becomes `-1` and every later light shifts down by one. Lights past
//! the additional light capacity also become `-1`, which bounds the length of
//! every per-object light list.
//!
//! The map is rewritten in place and must be remapped exactly once per frame,
//! after culling and before any per-object draw reads it. Running it twice
//! on the same map shifts indices again.

use super::additional::AdditionalLightSet;
use crate::renderer::buffer::BufferAllocator;
use crate::renderer::culling::{LightCulling, LightData};

/// Rewrites `index_map` and returns the number of additional lights kept.
pub fn remap_light_index_map(
    lights: &LightData<'_>,
    index_map: &mut [i32],
    max_additional_lights: usize,
) -> usize {
    if lights.additional_lights_count == 0 {
        return 0;
    }

    let mut global_lights = 0;
    let mut kept = 0;

    let visible = lights.visible_lights.len().min(index_map.len());
    for (i, entry) in index_map.iter_mut().enumerate().take(visible) {
        if kept >= max_additional_lights {
            break;
        }
        if lights.is_main_light(i) {
            *entry = -1;
            global_lights += 1;
        } else {
            *entry -= global_lights;
            kept += 1;
        }
    }

    let cutoff = (global_lights as usize + kept).min(index_map.len());
    for entry in &mut index_map[cutoff..] {
        *entry = -1;
    }

    kept
}

/// Remaps the culling subsystem's map and, for the structured layout, has it
/// fill the flattened light index buffer.
///
/// A structured frame with kept lights but an empty flattened index list is
/// a culling contract breach. It is reported and the fill is skipped; the
/// shader then reads whatever the index buffer held before.
pub fn setup_per_object_light_indices(
    lights: &LightData<'_>,
    culling: &mut dyn LightCulling,
    additional: &mut AdditionalLightSet,
    allocator: &mut dyn BufferAllocator,
    max_additional_lights: usize,
) -> usize {
    let kept = remap_light_index_map(lights, culling.light_index_map_mut(), max_additional_lights);

    if let AdditionalLightSet::StructuredBuffer(buffers) = additional
        && kept > 0
    {
        let index_count = culling.light_and_probe_index_count();
        if index_count == 0 {
            log::error!(
                "Pipeline configures {kept} additional lights but per-object light and probe index count is zero"
            );
        } else {
            let buffer = buffers.light_indices_buffer(allocator, index_count);
            culling.fill_light_and_probe_indices(allocator, buffer);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::settings::{AdditionalLightsMode, LightingSettings};
    use crate::scene::VisibleLight;
    use glam::{Quat, Vec3};

    fn lights(n: usize) -> Vec<VisibleLight> {
        (0..n)
            .map(|i| VisibleLight::new_point(Vec3::ONE, 1.0, Vec3::X * i as f32, 5.0))
            .collect()
    }

    fn light_data<'a>(lights: &'a [VisibleLight], main: Option<usize>, max: usize) -> LightData<'a> {
        let settings = LightingSettings {
            max_visible_additional_lights: max,
            ..Default::default()
        };
        LightData::new(lights, main, AdditionalLightsMode::PerPixel, &settings)
    }

    #[test]
    fn main_light_removed_and_followers_shifted() {
        let mut visible = lights(4);
        visible[1] = VisibleLight::new_directional(Vec3::ONE, 1.0, Quat::IDENTITY);
        let data = light_data(&visible, Some(1), 8);
        let mut map = vec![0, 1, 2, 3];

        let kept = remap_light_index_map(&data, &mut map, 8);
        assert_eq!(kept, 3);
        assert_eq!(map, vec![0, -1, 1, 2]);
    }

    #[test]
    fn lights_past_capacity_disabled() {
        let visible = lights(5);
        let data = light_data(&visible, None, 2);
        let mut map = vec![0, 1, 2, 3, 4];

        let kept = remap_light_index_map(&data, &mut map, 2);
        assert_eq!(kept, 2);
        assert_eq!(map, vec![0, 1, -1, -1, -1]);
    }

    #[test]
    fn no_additional_lights_leaves_map_untouched() {
        let visible = lights(1);
        let data = light_data(&visible, Some(0), 8);
        let mut map = vec![0];

        assert_eq!(remap_light_index_map(&data, &mut map, 8), 0);
        assert_eq!(map, vec![0]);
    }

    #[test]
    fn remapping_twice_is_not_idempotent() {
        let mut visible = lights(3);
        visible[0] = VisibleLight::new_directional(Vec3::ONE, 1.0, Quat::IDENTITY);
        let data = light_data(&visible, Some(0), 8);
        let mut map = vec![0, 1, 2];

        remap_light_index_map(&data, &mut map, 8);
        let once = map.clone();
        remap_light_index_map(&data, &mut map, 8);
        assert_ne!(map, once);
    }
}
