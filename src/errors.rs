//! Error Types
//!
//! This module defines the error types used by the light preparation core.
//!
//! # Overview
//!
//! Per-frame preparation never fails: capacity overflow is truncated and a
//! missing compute backend degrades the shading mode. The only failures are
//! configuration problems caught when a [`ForwardLights`] instance is built.
//!
//! ```rust,ignore
//! use forward_lights::errors::Result;
//! use forward_lights::{ForwardLights, LightingSettings, PlatformCapabilities};
//!
//! fn build() -> Result<ForwardLights> {
//!     ForwardLights::new(LightingSettings::default(), PlatformCapabilities::desktop())
//! }
//! ```
//!
//! [`ForwardLights`]: crate::renderer::lights::ForwardLights

use thiserror::Error;

/// Configuration errors raised while validating [`LightingSettings`].
///
/// [`LightingSettings`]: crate::renderer::settings::LightingSettings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LightingError {
    // ========================================================================
    // Light Capacity Errors
    // ========================================================================
    /// The additional light arrays must hold at least one light.
    #[error("Max visible additional lights must be greater than zero")]
    ZeroAdditionalLightCapacity,

    /// Per-cluster light indices are packed four per element.
    #[error(
        "Max per-cluster lights must be a non-zero multiple of {alignment} (got {value})"
    )]
    MisalignedClusterCapacity {
        /// The configured per-cluster capacity
        value: u32,
        /// Number of light indices packed into one buffer element
        alignment: u32,
    },

    // ========================================================================
    // Cluster Grid Errors
    // ========================================================================
    /// Tile size in pixels must be positive.
    #[error("Cluster tile size must be greater than zero")]
    ZeroTileSize,

    /// The grid needs at least one depth slice.
    #[error("Cluster depth slice count must be greater than zero")]
    ZeroDepthSlices,

    /// A grid parameter that must be a positive finite number was not.
    #[error("Invalid cluster grid parameter `{name}`: {value}")]
    InvalidGridParameter {
        /// Name of the offending field
        name: &'static str,
        /// The rejected value
        value: f32,
    },
}

/// Alias for `Result<T, LightingError>`.
pub type Result<T> = std::result::Result<T, LightingError>;
