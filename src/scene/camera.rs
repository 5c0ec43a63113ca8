/// Per-frame camera parameters consumed by the light grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Viewport size in pixels.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// View-space clip distances (positive).
    pub near: f32,
    pub far: f32,
}

impl CameraData {
    #[must_use]
    pub fn new(pixel_width: u32, pixel_height: u32, near: f32, far: f32) -> Self {
        Self {
            pixel_width,
            pixel_height,
            near,
            far,
        }
    }
}

impl Default for CameraData {
    fn default() -> Self {
        Self::new(1280, 720, 0.1, 1000.0)
    }
}
