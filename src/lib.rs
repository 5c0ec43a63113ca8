#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{LightingError, Result};
pub use renderer::buffer::{BufferAllocator, BufferDesc, BufferHandle, HeadlessAllocator, WgpuBufferAllocator};
pub use renderer::command::{CommandRecorder, CommandSink, ComputeKernel, ShaderKeywords};
pub use renderer::culling::{CullingResults, LightCulling, LightData, RenderingData};
pub use renderer::lights::{ForwardLights, FrameLightingSummary};
pub use renderer::settings::{AdditionalLightsMode, ClusterGridConfig, LightingSettings, PlatformCapabilities};
pub use resources::{LightGridParams, PackedLightRecord};
pub use scene::{CameraData, LightKind, SpotCone, VisibleLight};
