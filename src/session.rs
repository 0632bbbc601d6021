//! Viewport session: the lifecycle of one mounted hero viewport.
//!
//! A session is created by [`ViewportSession::mount`] and lives until
//! [`ViewportSession::teardown`] (or drop). Mounting builds the scene, camera,
//! light rig and controls, starts the model fetch, starts the frame loop and
//! registers the host listeners. Teardown releases all of it; after that every
//! frame tick and host event is a no-op, and a model fetch that resolves late
//! is discarded with its channel.
//!
//! The "user has interacted" flag is plain session state read by the frame
//! update. Flipping it never rebuilds anything.

use log::{debug, error, info};

use crate::asset::{place_model, ModelSource, PendingModel, MODEL_NODE};
use crate::camera::PerspectiveCamera;
use crate::config::ViewportConfig;
use crate::controls::OrbitControls;
use crate::frame_loop::FrameLoop;
use crate::lights::hero_rig;
use crate::renderer::SceneRenderer;
use crate::scene::{Scene, SceneObject};
use crate::surface::{DrawableSurface, FrameScheduler, HostEvent, Listener, Listeners, LogicalSize};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// Fetch in flight; the loading indicator is shown.
    Loading,
    Loaded,
    /// Fetch failed; the viewport shows lights only.
    Failed,
}

pub struct ViewportSession<S, R>
where
    S: DrawableSurface + FrameScheduler,
    R: SceneRenderer,
{
    surface: S,
    renderer: R,
    config: ViewportConfig,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    listeners: Listeners,
    frame_loop: FrameLoop,
    pending: Option<PendingModel>,
    asset_state: AssetState,
    interacted: bool,
    size: LogicalSize,
    disposed: bool,
}

impl<S, R> ViewportSession<S, R>
where
    S: DrawableSurface + FrameScheduler,
    R: SceneRenderer,
{
    /// Set up the viewport on `surface` and start fetching the model.
    pub fn mount(surface: S, mut renderer: R, source: &dyn ModelSource, config: ViewportConfig) -> Self {
        let size = surface.content_size().or(config.fallback_size());

        let camera = PerspectiveCamera::for_viewport(size.width, size.height);
        renderer.set_pixel_ratio(config.pixel_ratio(surface.device_pixel_ratio()));
        renderer.set_size(size);

        let mut scene = Scene::new();
        for rig in hero_rig() {
            scene.add_object(SceneObject::light(rig.name, rig.light));
        }

        let controls = OrbitControls::hero(config.enable_zoom);
        let mut listeners = Listeners::default();
        listeners.add(Listener::Controls);
        listeners.add(Listener::PointerDown);
        listeners.add(Listener::Wheel);

        let pending = source.fetch(&config.asset_path);

        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&surface);

        listeners.add(Listener::Resize);

        info!(
            "viewport mounted at {}x{}, loading {}",
            size.width, size.height, config.asset_path
        );

        Self {
            surface,
            renderer,
            config,
            scene,
            camera,
            controls,
            listeners,
            frame_loop,
            pending: Some(pending),
            asset_state: AssetState::Loading,
            interacted: false,
            size,
            disposed: false,
        }
    }

    /// One frame: take a resolved model, auto-rotate, damp controls, render.
    /// Returns false once the loop has been cancelled.
    pub fn frame(&mut self) -> bool {
        if self.disposed || !self.frame_loop.is_running() {
            return false;
        }
        self.poll_asset();

        let step = self.config.auto_rotate_step;
        let interacted = self.interacted;
        let scene = &mut self.scene;
        let camera = &mut self.camera;
        let controls = &mut self.controls;
        let renderer = &mut self.renderer;

        self.frame_loop.tick(&self.surface, || {
            if !interacted {
                if let Some(model) = scene.get_object_mut(MODEL_NODE) {
                    model.transform.rotate_y(step);
                }
            }
            controls.update(camera);
            renderer.render(scene, camera);
        })
    }

    /// Insert the model if its fetch has resolved.
    pub fn poll_asset(&mut self) {
        if self.disposed {
            return;
        }
        let Some(result) = self.pending.as_mut().and_then(PendingModel::poll) else {
            return;
        };
        self.pending = None;

        match result {
            Ok(model) => {
                let node = place_model(model, self.config.model_scale, self.config.attach_model_light);
                debug!("model placed at {:?}", node.transform.position);
                self.scene.add_object(node);
                self.asset_state = AssetState::Loaded;
                info!("hero model ready");
            }
            Err(err) => {
                error!("failed to load {}: {err}", self.config.asset_path);
                self.asset_state = AssetState::Failed;
            }
        }
    }

    /// Route a host event to its listener. Returns whether anything handled it.
    pub fn handle_event(&mut self, event: HostEvent) -> bool {
        if self.disposed || !self.listeners.contains(event.listener()) {
            return false;
        }
        match event {
            HostEvent::Resize => return self.resize(),
            HostEvent::PointerDown { x, y } => {
                self.mark_interacted();
                self.controls.pointer_down(x, y);
            }
            HostEvent::PointerMove { x, y } => {
                self.controls.pointer_move(x, y, self.size.height as f32);
            }
            HostEvent::PointerUp => self.controls.pointer_up(),
            HostEvent::Wheel { notches } => {
                self.mark_interacted();
                self.controls.wheel(notches);
            }
        }
        true
    }

    /// Re-measure the surface and follow its size. Zero-sized surfaces are
    /// ignored.
    pub fn resize(&mut self) -> bool {
        if self.disposed || !self.listeners.contains(Listener::Resize) {
            return false;
        }
        let size = self.surface.content_size();
        if size.is_empty() {
            debug!("ignoring resize to {}x{}", size.width, size.height);
            return false;
        }

        self.size = size;
        self.camera.aspect = size.aspect();
        self.camera.update_projection_matrix();
        // the display density may have changed with the size
        self.renderer
            .set_pixel_ratio(self.config.pixel_ratio(self.surface.device_pixel_ratio()));
        self.renderer.set_size(size);
        debug!("viewport resized to {}x{}", size.width, size.height);
        true
    }

    pub fn apply_theme(&mut self, theme: Theme) {
        if !self.disposed {
            self.renderer.set_clear_color(theme.background());
        }
    }

    /// Release listeners, controls, renderer, frame loop and any in-flight
    /// fetch. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.listeners.remove(Listener::Resize);
        self.listeners.remove(Listener::PointerDown);
        self.listeners.remove(Listener::Wheel);
        self.listeners.remove(Listener::Controls);
        self.controls.dispose();
        self.renderer.dispose();
        self.frame_loop.cancel();
        if self.pending.take().is_some() {
            debug!("dropping in-flight model fetch");
        }
        self.disposed = true;
        info!("viewport torn down after {} frames", self.frame_loop.frames());
    }

    fn mark_interacted(&mut self) {
        if !self.interacted {
            self.interacted = true;
            info!("user interaction, auto-rotate stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        !self.disposed
    }

    pub fn is_loading(&self) -> bool {
        self.asset_state == AssetState::Loading
    }

    pub fn asset_state(&self) -> AssetState {
        self.asset_state
    }

    pub fn has_interacted(&self) -> bool {
        self.interacted
    }

    pub fn size(&self) -> LogicalSize {
        self.size
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn frames(&self) -> u64 {
        self.frame_loop.frames()
    }
}

impl<S, R> Drop for ViewportSession<S, R>
where
    S: DrawableSurface + FrameScheduler,
    R: SceneRenderer,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
