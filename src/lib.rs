//! hero-viewport: the interactive 3D hero banner of a portfolio page.
//!
//! [`session::ViewportSession`] owns one mounted viewport. The host provides a
//! [`surface::DrawableSurface`], a [`renderer::SceneRenderer`] and an
//! [`asset::ModelSource`]; the binary wires these to a winit window, wgpu and
//! the filesystem.

pub mod asset;
pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod host;
pub mod lights;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod surface;
pub mod theme;
