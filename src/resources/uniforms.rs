//! GPU-facing light records.
//!
//! Each record is declared once through [`define_uniform_struct!`], which
//! emits the `#[repr(C)]` Pod struct, its `Default` (the "no light" constants)
//! and the matching WGSL struct definition, so the shader side cannot drift
//! from the CPU layout.

use glam::Vec4;
use std::borrow::Cow;
use std::collections::HashSet;

// ============================================================================
// Rust type -> WGSL type name
// ============================================================================

pub trait WgslType {
    fn wgsl_type_name() -> Cow<'static, str>;

    fn collect_wgsl_defs(_defs: &mut Vec<String>, _inserted: &mut HashSet<String>) {}
}

impl WgslType for f32 { fn wgsl_type_name() -> Cow<'static, str> { "f32".into() } }
impl WgslType for i32 { fn wgsl_type_name() -> Cow<'static, str> { "i32".into() } }
impl WgslType for u32 { fn wgsl_type_name() -> Cow<'static, str> { "u32".into() } }
impl WgslType for Vec4 { fn wgsl_type_name() -> Cow<'static, str> { "vec4<f32>".into() } }

pub trait WgslStruct: bytemuck::Pod + bytemuck::Zeroable {
    fn wgsl_struct_def(struct_name: &str) -> String;
}

// ============================================================================
// Single source of truth macro
// ============================================================================

macro_rules! define_uniform_struct {
    (
        $(#[$meta:meta])* struct $name:ident {
            $(
                $vis:vis $field_name:ident : $field_type:ty $(= $default_val:expr)?
            ),* $(,)?
        }
    ) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        $(#[$meta])*
        pub struct $name {
            $( $vis $field_name : $field_type, )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field_name: define_uniform_struct!(@val_or_default $field_type $(, $default_val)?), )*
                }
            }
        }

        impl WgslType for $name {
            fn wgsl_type_name() -> Cow<'static, str> {
                stringify!($name).into()
            }

            fn collect_wgsl_defs(defs: &mut Vec<String>, inserted: &mut HashSet<String>) {
                $( <$field_type as WgslType>::collect_wgsl_defs(defs, inserted); )*

                let my_name = stringify!($name);
                if inserted.insert(my_name.to_string()) {
                    defs.push(define_uniform_struct!(@gen_body my_name, { $( $field_name : $field_type ),* }));
                }
            }
        }

        impl WgslStruct for $name {
            fn wgsl_struct_def(struct_name: &str) -> String {
                let mut defs = Vec::new();
                let mut inserted = HashSet::new();
                $( <$field_type as WgslType>::collect_wgsl_defs(&mut defs, &mut inserted); )*
                defs.push(define_uniform_struct!(@gen_body struct_name, { $( $field_name : $field_type ),* }));
                defs.join("\n")
            }
        }
    };

    (@val_or_default $type:ty, $val:expr) => { $val };
    (@val_or_default $type:ty) => { <$type as Default>::default() };

    (@gen_body $name_str:expr, { $( $field_name:ident : $field_type:ty ),* }) => {{
        let mut code = format!("struct {} {{\n", $name_str);
        $(
            if !stringify!($field_name).starts_with("__") {
                code.push_str(&format!(
                    "    {}: {},\n",
                    stringify!($field_name),
                    <$field_type as WgslType>::wgsl_type_name()
                ));
            }
        )*
        code.push_str("};\n");
        code
    }};
}

// ============================================================================
// Light records
// ============================================================================

define_uniform_struct!(
    /// Packed constants for one light, laid out as five `vec4<f32>`.
    ///
    /// - `position`: xyz = world position (w = 1) or direction towards the
    ///   light (w = 0).
    /// - `attenuation`: xy = distance fade coefficients, zw = spot cone
    ///   coefficients.
    /// - `spot_direction`: xyz = direction towards the light, w = tan of the
    ///   outer half angle.
    /// - `occlusion_probe_channels`: x = baked channel, y = 1 when unbaked.
    ///
    /// The default value is what the shader sees when there is no light.
    struct PackedLightRecord {
        pub position: Vec4 = Vec4::new(0.0, 0.0, 1.0, 0.0),
        pub color: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0),
        pub attenuation: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0),
        pub spot_direction: Vec4 = Vec4::new(0.0, 0.0, 1.0, 0.0),
        pub occlusion_probe_channels: Vec4 = Vec4::new(-1.0, 1.0, -1.0, -1.0),
    }
);

define_uniform_struct!(
    /// Cluster grid parameters shared by the culling compute pass and the
    /// fragment lookup.
    ///
    /// - `grid_size`: x/y = tiles, z = depth slices, w = per-cell attenuation
    ///   constant.
    /// - `z_params`: (B, O, S, near) for `slice = log2(z * B + O) * S`.
    struct LightGridParams {
        pub grid_size: Vec4,
        pub z_params: Vec4,
    }
);
