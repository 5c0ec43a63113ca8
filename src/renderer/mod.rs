//! Renderer-side light preparation.
//!
//! - [`settings`]: static configuration and platform capabilities
//! - [`command`]: the GPU submission channel
//! - [`buffer`]: buffer allocation seam
//! - [`culling`]: frame inputs owned by the visibility subsystem
//! - [`lights`]: the per-frame light pipeline ([`ForwardLights`])
//!
//! [`ForwardLights`]: lights::ForwardLights

pub mod buffer;
pub mod command;
pub mod culling;
pub mod lights;
pub mod settings;
