use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::rendering::Affine2;
use crate::math::Vec2;

pub const CAMERA_ZOOM_SENSITIVITY: f32 = 2000.0;
pub const CAMERA_SCALE_MIN: f32 = 0.3;
pub const CAMERA_SCALE_MAX: f32 = 5.0;
pub const CAMERA_SCALE_DEFAULT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub zoom_sensitivity: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub initial_scale: f32,
    pub initial_offset: Vec2,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom_sensitivity: CAMERA_ZOOM_SENSITIVITY,
            min_scale: CAMERA_SCALE_MIN,
            max_scale: CAMERA_SCALE_MAX,
            initial_scale: CAMERA_SCALE_DEFAULT,
            initial_offset: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CameraError {
    #[error("scale range is invalid: min {min} must be positive and below max {max}")]
    InvalidScaleRange { min: f32, max: f32 },
    #[error("initial scale {scale} is outside [{min}, {max}]")]
    InitialScaleOutOfRange { scale: f32, min: f32, max: f32 },
    #[error("zoom sensitivity must be positive and finite, got {0}")]
    InvalidZoomSensitivity(f32),
    #[error("canvas transform is not invertible")]
    SingularCanvasTransform,
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), CameraError> {
        if !(self.min_scale > 0.0
            && self.min_scale < self.max_scale
            && self.max_scale.is_finite())
        {
            return Err(CameraError::InvalidScaleRange {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !(self.min_scale..=self.max_scale).contains(&self.initial_scale) {
            return Err(CameraError::InitialScaleOutOfRange {
                scale: self.initial_scale,
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !(self.zoom_sensitivity > 0.0 && self.zoom_sensitivity.is_finite()) {
            return Err(CameraError::InvalidZoomSensitivity(self.zoom_sensitivity));
        }
        Ok(())
    }
}

/// Floating-origin camera: the world-to-screen mapping is a scale plus an
/// offset, where `offset` is the world point shown at the canvas corner.
///
/// `screen = canvas * ((world - offset) * scale)`
///
/// Pointer locations are canvas-relative pixels (the host subtracts the
/// canvas corner before handing them in).
#[derive(Debug, Clone)]
pub struct FloatingOrigin {
    config: CameraConfig,
    offset: Vec2,
    scale: f32,
    current_pointer: Vec2,
    last_pointer: Vec2,
    panning: bool,
    canvas: Affine2,
    canvas_inverse: Affine2,
}

impl FloatingOrigin {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        config.validate()?;
        Ok(Self {
            config,
            offset: config.initial_offset,
            scale: config.initial_scale,
            current_pointer: Vec2::ZERO,
            last_pointer: Vec2::ZERO,
            panning: false,
            canvas: Affine2::IDENTITY,
            canvas_inverse: Affine2::IDENTITY,
        })
    }

    /// Installs the host canvas's own base transform (device pixel ratio,
    /// centring, ...). It is composed outside the camera's scale/offset.
    pub fn with_canvas_transform(mut self, canvas: Affine2) -> Result<Self, CameraError> {
        let inverse = canvas
            .inverse()
            .ok_or(CameraError::SingularCanvasTransform)?;
        self.canvas = canvas;
        self.canvas_inverse = inverse;
        Ok(self)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn pointer_location(&self) -> Vec2 {
        self.current_pointer
    }

    pub fn last_pointer_location(&self) -> Vec2 {
        self.last_pointer
    }

    /// Applies a wheel delta. Returns `false` (and changes nothing) when the
    /// resulting scale would leave `[min_scale, max_scale]`. On success the
    /// world point under the pointer stays fixed on screen.
    pub fn zoom(&mut self, delta_y: f32) -> bool {
        let factor = 1.0 - delta_y / self.config.zoom_sensitivity;
        let new_scale = self.scale * factor;
        if !new_scale.is_finite()
            || new_scale < self.config.min_scale
            || new_scale > self.config.max_scale
        {
            trace!(delta_y, scale = self.scale, new_scale, "zoom_rejected");
            return false;
        }

        let anchor = self.canvas_inverse.apply(self.current_pointer);
        let before = anchor / self.scale;
        let after = anchor / new_scale;
        self.offset = self.offset + (before - after);
        self.scale = new_scale;
        true
    }

    /// Records a new canvas-relative pointer location, keeping the previous one.
    pub fn track_cursor(&mut self, corner_top_left: Vec2, pointer: Vec2) {
        self.last_pointer = self.current_pointer;
        self.current_pointer = pointer - corner_top_left;
    }

    /// Pointer motion as delivered by the host: tracks, then pans while the
    /// pan button is held.
    pub fn pointer_moved(&mut self, corner_top_left: Vec2, pointer: Vec2) {
        self.track_cursor(corner_top_left, pointer);
        self.pan();
    }

    pub fn start_panning(&mut self) {
        self.panning = true;
    }

    pub fn stop_panning(&mut self) {
        self.panning = false;
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Drags the view by the last pointer delta. No-op unless panning.
    pub fn pan(&mut self) -> bool {
        if !self.panning {
            return false;
        }
        let current = self.canvas_inverse.apply(self.current_pointer);
        let last = self.canvas_inverse.apply(self.last_pointer);
        self.offset = self.offset - (current - last) / self.scale;
        true
    }

    /// The full world-to-screen transform for the current scale and offset.
    pub fn projection(&self) -> Affine2 {
        self.canvas
            .then(Affine2::scale(self.scale))
            .then(Affine2::translate(-self.offset))
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.canvas.apply((world - self.offset) * self.scale)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.canvas_inverse.apply(screen) / self.scale + self.offset
    }
}
