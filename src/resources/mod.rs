pub mod uniforms;

pub use uniforms::{LightGridParams, PackedLightRecord, WgslStruct};
