// Host surface and the events it delivers to the viewport

use std::collections::HashSet;

/// Size in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalSize {
    pub width: u32,
    pub height: u32,
}

impl LogicalSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Replace with `fallback` when either side is zero.
    pub fn or(self, fallback: LogicalSize) -> LogicalSize {
        if self.is_empty() {
            fallback
        } else {
            self
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// The page region the viewport draws into.
pub trait DrawableSurface {
    /// Current content-box size; may be zero while hidden or not laid out.
    fn content_size(&self) -> LogicalSize;

    /// Physical pixels per logical pixel.
    fn device_pixel_ratio(&self) -> f64;
}

/// Host primitive used to ask for the next frame callback.
pub trait FrameScheduler {
    fn request_frame(&self);
}

/// Events the host forwards to a mounted viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Resize,
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    /// Wheel travel in notches; positive scrolls toward the scene.
    Wheel { notches: f32 },
}

impl HostEvent {
    /// Which listener an event is routed to.
    pub fn listener(&self) -> Listener {
        match self {
            HostEvent::Resize => Listener::Resize,
            HostEvent::PointerDown { .. } => Listener::PointerDown,
            HostEvent::PointerMove { .. } | HostEvent::PointerUp => Listener::Controls,
            HostEvent::Wheel { .. } => Listener::Wheel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Window-level resize.
    Resize,
    /// Surface pointer-down; flips the interaction flag.
    PointerDown,
    /// Surface wheel; flips the interaction flag.
    Wheel,
    /// Orbit controls' own pointer tracking.
    Controls,
}

/// Listeners currently registered by a session.
#[derive(Debug, Default)]
pub struct Listeners {
    active: HashSet<Listener>,
}

impl Listeners {
    /// Returns false if the listener was already registered.
    pub fn add(&mut self, listener: Listener) -> bool {
        self.active.insert(listener)
    }

    pub fn remove(&mut self, listener: Listener) -> bool {
        self.active.remove(&listener)
    }

    pub fn contains(&self, listener: Listener) -> bool {
        self.active.contains(&listener)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
