// hero-viewport: portfolio hero banner in a native window

use std::sync::Arc;

use log::{error, info};
use winit::{
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use hero_viewport::asset::GltfFileSource;
use hero_viewport::config::ViewportConfig;
use hero_viewport::error::AppError;
use hero_viewport::host::{EventTranslator, WindowSurface};
use hero_viewport::renderer::WgpuRenderer;
use hero_viewport::session::ViewportSession;
use hero_viewport::surface::DrawableSurface;
use hero_viewport::theme::{FileStorage, ThemeToggle};

const TITLE: &str = "hero-viewport";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    env_logger::init();

    let config = ViewportConfig::load()?;
    let mut theme = ThemeToggle::mount(FileStorage::open(&config.storage_path)?)?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("{TITLE} (loading)"))
            .with_transparent(true)
            .with_inner_size(winit::dpi::LogicalSize::new(800.0, 600.0))
            .build(&event_loop)?,
    );

    let surface = WindowSurface::new(Arc::clone(&window));
    let renderer = WgpuRenderer::new(
        Arc::clone(&window),
        surface.content_size().or(config.fallback_size()),
    )
    .await?;
    let source = GltfFileSource::new(&config.site_root, tokio::runtime::Handle::current());

    let mut session = Some(ViewportSession::mount(surface, renderer, &source, config));
    if let Some(session) = session.as_mut() {
        session.apply_theme(theme.theme());
    }
    let mut translator = EventTranslator::default();
    let mut loading = true;

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Wait);

        let Event::WindowEvent { window_id, event } = event else {
            return;
        };
        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(mut session) = session.take() {
                    session.teardown();
                }
                target.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(session) = session.as_mut() else {
                    return;
                };
                session.frame();
                if loading && !session.is_loading() {
                    loading = false;
                    window.set_title(TITLE);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyT),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match theme.toggle() {
                Ok(next) => {
                    info!("theme switched to {}", next.as_str());
                    if let Some(session) = session.as_mut() {
                        session.apply_theme(next);
                    }
                }
                Err(err) => error!("failed to persist theme: {err}"),
            },
            other => {
                if let (Some(session), Some(host_event)) = (
                    session.as_mut(),
                    translator.translate(&other, window.scale_factor()),
                ) {
                    session.handle_event(host_event);
                }
            }
        }
    })?;

    Ok(())
}
