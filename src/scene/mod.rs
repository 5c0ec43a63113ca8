//! Scene-side inputs of the light core: visible lights and the camera.

pub mod camera;
pub mod light;

pub use camera::CameraData;
pub use light::{
    LightBakingOutput, LightKind, LightShadows, LightmapBakeType, MixedLightingMode, SpotCone,
    VisibleLight,
};
