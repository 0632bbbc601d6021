// winit glue: the window stands in for the page region hosting the viewport

use std::sync::Arc;

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::window::Window;

use crate::surface::{DrawableSurface, FrameScheduler, HostEvent, LogicalSize};

/// Pixels of trackpad scroll treated as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 100.0;

#[derive(Clone)]
pub struct WindowSurface {
    window: Arc<Window>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl DrawableSurface for WindowSurface {
    fn content_size(&self) -> LogicalSize {
        let size = self.window.inner_size().to_logical::<u32>(self.window.scale_factor());
        LogicalSize::new(size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }
}

impl FrameScheduler for WindowSurface {
    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Turns raw window events into [`HostEvent`]s, tracking the cursor so
/// button presses carry a position.
#[derive(Debug, Default)]
pub struct EventTranslator {
    cursor: [f32; 2],
}

impl EventTranslator {
    pub fn translate(&mut self, event: &WindowEvent, scale_factor: f64) -> Option<HostEvent> {
        match event {
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => Some(HostEvent::Resize),
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale_factor);
                self.cursor = [logical.x, logical.y];
                Some(HostEvent::PointerMove {
                    x: logical.x,
                    y: logical.y,
                })
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => Some(match state {
                ElementState::Pressed => HostEvent::PointerDown {
                    x: self.cursor[0],
                    y: self.cursor[1],
                },
                ElementState::Released => HostEvent::PointerUp,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_NOTCH) as f32,
                };
                Some(HostEvent::Wheel { notches })
            }
            _ => None,
        }
    }
}
