use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use log::{Level, LevelFilter, Log, Metadata, Record};
use tokio::sync::oneshot;

use hero_viewport::asset::{LoadedModel, MeshData, ModelSource, PendingModel, MODEL_NODE};
use hero_viewport::camera::PerspectiveCamera;
use hero_viewport::config::ViewportConfig;
use hero_viewport::error::AssetError;
use hero_viewport::renderer::SceneRenderer;
use hero_viewport::scene::Scene;
use hero_viewport::session::{AssetState, ViewportSession};
use hero_viewport::surface::{DrawableSurface, FrameScheduler, HostEvent, LogicalSize};
use hero_viewport::theme::Theme;

// --- log capture -----------------------------------------------------------

struct CaptureLogger;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

fn capture_logs() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Debug);
    RECORDS.with(|r| r.borrow_mut().clear());
}

fn logged_errors() -> Vec<String> {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, msg)| msg.clone())
            .collect()
    })
}

// --- fakes -----------------------------------------------------------------

#[derive(Clone)]
struct FakeSurface {
    size: Rc<Cell<LogicalSize>>,
    frame_requests: Rc<Cell<u32>>,
    pixel_ratio: Rc<Cell<f64>>,
}

impl FakeSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: Rc::new(Cell::new(LogicalSize::new(width, height))),
            frame_requests: Rc::new(Cell::new(0)),
            pixel_ratio: Rc::new(Cell::new(3.0)),
        }
    }

    fn set_size(&self, width: u32, height: u32) {
        self.size.set(LogicalSize::new(width, height));
    }

    fn set_pixel_ratio(&self, ratio: f64) {
        self.pixel_ratio.set(ratio);
    }
}

impl DrawableSurface for FakeSurface {
    fn content_size(&self) -> LogicalSize {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio.get()
    }
}

impl FrameScheduler for FakeSurface {
    fn request_frame(&self) {
        self.frame_requests.set(self.frame_requests.get() + 1);
    }
}

#[derive(Default)]
struct RenderLog {
    sizes: Vec<LogicalSize>,
    pixel_ratio: Option<f64>,
    clear_color: Option<[f64; 4]>,
    renders: usize,
    last_model_count: usize,
    disposed: bool,
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
}

impl SceneRenderer for RecordingRenderer {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.log.borrow_mut().pixel_ratio = Some(ratio);
    }

    fn set_size(&mut self, size: LogicalSize) {
        self.log.borrow_mut().sizes.push(size);
    }

    fn set_clear_color(&mut self, rgba: [f64; 4]) {
        self.log.borrow_mut().clear_color = Some(rgba);
    }

    fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) {
        let mut log = self.log.borrow_mut();
        assert!(!log.disposed, "rendered after dispose");
        log.renders += 1;
        log.last_model_count = scene.model_count();
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed = true;
    }
}

/// Source whose single fetch is resolved by the test.
#[derive(Default)]
struct ManualSource {
    requested: RefCell<Vec<String>>,
    sender: RefCell<Option<oneshot::Sender<Result<LoadedModel, AssetError>>>>,
}

impl ManualSource {
    /// Returns false if the viewport already dropped its end.
    fn resolve(&self, result: Result<LoadedModel, AssetError>) -> bool {
        let sender = self.sender.borrow_mut().take().expect("no fetch in flight");
        sender.send(result).is_ok()
    }
}

impl ModelSource for ManualSource {
    fn fetch(&self, path: &str) -> PendingModel {
        let (tx, rx) = oneshot::channel();
        self.requested.borrow_mut().push(path.to_string());
        *self.sender.borrow_mut() = Some(tx);
        PendingModel::new(rx)
    }
}

fn off_center_model() -> LoadedModel {
    let positions: Vec<[f32; 3]> = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { 3.0 } else { 5.0 },
                if i & 2 == 0 { 1.0 } else { 2.0 },
                if i & 4 == 0 { -4.0 } else { -1.0 },
            ]
        })
        .collect();
    let mesh = MeshData {
        normals: vec![[0.0, 1.0, 0.0]; positions.len()],
        colors: vec![[1.0; 4]; positions.len()],
        positions,
        indices: vec![0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7],
    };
    LoadedModel::from_meshes(vec![mesh]).unwrap()
}

type Session = ViewportSession<FakeSurface, RecordingRenderer>;

fn mount(width: u32, height: u32) -> (Session, FakeSurface, RecordingRenderer, ManualSource) {
    let surface = FakeSurface::new(width, height);
    let renderer = RecordingRenderer::default();
    let source = ManualSource::default();
    let session = ViewportSession::mount(
        surface.clone(),
        renderer.clone(),
        &source,
        ViewportConfig::default(),
    );
    (session, surface, renderer, source)
}

fn model_yaw(session: &Session) -> f32 {
    session.scene().get_object(MODEL_NODE).unwrap().transform.yaw()
}

// --- tests -----------------------------------------------------------------

#[test]
fn mount_measures_surface_and_caps_pixel_ratio() {
    let (session, surface, renderer, source) = mount(800, 600);

    assert_relative_eq!(session.camera().aspect, 1.3333, epsilon = 1e-4);
    assert_eq!(session.camera().aspect, 800.0 / 600.0);
    let log = renderer.log.borrow();
    assert_eq!(log.sizes, vec![LogicalSize::new(800, 600)]);
    assert_eq!(log.pixel_ratio, Some(2.0));
    assert_eq!(surface.frame_requests.get(), 1);
    assert_eq!(*source.requested.borrow(), vec!["/models/3d.glb".to_string()]);
    assert_eq!(session.listeners().len(), 4);
}

#[test]
fn zero_sized_surface_mounts_at_fallback() {
    let (session, _, renderer, _) = mount(0, 300);
    assert_eq!(session.size(), LogicalSize::new(400, 400));
    assert_eq!(session.camera().aspect, 1.0);
    assert_eq!(renderer.log.borrow().sizes, vec![LogicalSize::new(400, 400)]);
}

#[test]
fn resize_follows_surface() {
    let (mut session, surface, renderer, _) = mount(800, 600);
    surface.set_size(400, 400);

    assert!(session.handle_event(HostEvent::Resize));
    assert_eq!(session.camera().aspect, 1.0);
    assert_eq!(
        renderer.log.borrow().sizes.last(),
        Some(&LogicalSize::new(400, 400))
    );
    assert_eq!(
        session.camera().projection_matrix(),
        PerspectiveCamera::for_viewport(400, 400).projection_matrix()
    );
}

#[test]
fn resize_picks_up_display_density_change() {
    let surface = FakeSurface::new(800, 600);
    surface.set_pixel_ratio(1.0);
    let renderer = RecordingRenderer::default();
    let source = ManualSource::default();
    let mut session = ViewportSession::mount(
        surface.clone(),
        renderer.clone(),
        &source,
        ViewportConfig::default(),
    );
    assert_eq!(renderer.log.borrow().pixel_ratio, Some(1.0));

    // moved to a high-density display: same logical size, new ratio
    surface.set_pixel_ratio(2.0);
    assert!(session.handle_event(HostEvent::Resize));
    assert_eq!(renderer.log.borrow().pixel_ratio, Some(2.0));
    assert_eq!(renderer.log.borrow().sizes.last(), Some(&LogicalSize::new(800, 600)));

    surface.set_pixel_ratio(3.0);
    session.handle_event(HostEvent::Resize);
    assert_eq!(renderer.log.borrow().pixel_ratio, Some(2.0));
}

#[test]
fn zero_sized_resize_changes_nothing() {
    let (mut session, surface, renderer, _) = mount(800, 600);
    let projection = session.camera().projection_matrix();

    for (w, h) in [(0, 600), (800, 0), (0, 0)] {
        surface.set_size(w, h);
        assert!(!session.handle_event(HostEvent::Resize));
    }
    assert_eq!(session.camera().aspect, 800.0 / 600.0);
    assert_eq!(session.camera().projection_matrix(), projection);
    assert_eq!(renderer.log.borrow().sizes.len(), 1);
    assert_eq!(session.size(), LogicalSize::new(800, 600));
}

#[test]
fn loading_until_fetch_resolves() {
    let (mut session, _, renderer, _) = mount(800, 600);
    for _ in 0..3 {
        assert!(session.frame());
    }
    assert!(session.is_loading());
    assert_eq!(session.scene().model_count(), 0);
    assert_eq!(renderer.log.borrow().renders, 3);
    assert_eq!(session.frames(), 3);
    assert_eq!(renderer.log.borrow().last_model_count, 0);
}

#[test]
fn resolved_model_is_inserted_once_and_centered() {
    let (mut session, _, renderer, source) = mount(800, 600);
    assert!(source.resolve(Ok(off_center_model())));

    session.poll_asset();
    assert!(!session.is_loading());
    assert_eq!(session.asset_state(), AssetState::Loaded);
    assert_eq!(session.scene().model_count(), 1);

    let bounds = session.scene().get_object(MODEL_NODE).unwrap().world_bounds().unwrap();
    let center = bounds.center();
    assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.y, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(center.z, 0.0, epsilon = 1e-5);

    session.poll_asset();
    session.frame();
    assert_eq!(session.scene().model_count(), 1);
    assert_eq!(renderer.log.borrow().last_model_count, 1);
}

#[test]
fn failed_fetch_clears_loading_and_logs() {
    capture_logs();
    let (mut session, _, _, source) = mount(800, 600);
    let err = AssetError::Io {
        path: "public/models/3d.glb".into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
    };
    assert!(source.resolve(Err(err)));

    assert!(session.frame());
    assert!(!session.is_loading());
    assert_eq!(session.asset_state(), AssetState::Failed);
    assert_eq!(session.scene().model_count(), 0);

    let errors = logged_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("/models/3d.glb"));
    // still renders lights-only
    assert!(session.frame());
}

#[test]
fn auto_rotation_stops_after_wheel() {
    let (mut session, _, _, source) = mount(800, 600);
    source.resolve(Ok(off_center_model()));
    session.poll_asset();

    let step = ViewportConfig::default().auto_rotate_step;
    let mut last = model_yaw(&session);
    for _ in 0..5 {
        session.frame();
        let yaw = model_yaw(&session);
        assert_relative_eq!(yaw - last, step, epsilon = 1e-5);
        last = yaw;
    }

    assert!(session.handle_event(HostEvent::Wheel { notches: 1.0 }));
    assert!(session.has_interacted());

    let frozen = model_yaw(&session);
    for _ in 0..5 {
        session.frame();
    }
    assert_eq!(model_yaw(&session), frozen);
}

#[test]
fn pointer_down_stops_rotation_but_orbit_still_moves_camera() {
    let (mut session, _, _, source) = mount(800, 600);
    source.resolve(Ok(off_center_model()));
    session.frame();

    session.handle_event(HostEvent::PointerDown { x: 100.0, y: 300.0 });
    session.handle_event(HostEvent::PointerMove { x: 300.0, y: 300.0 });
    session.handle_event(HostEvent::PointerUp);
    assert!(session.has_interacted());

    let yaw = model_yaw(&session);
    let camera_before = session.camera().position;
    session.frame();
    assert_eq!(model_yaw(&session), yaw);
    assert_ne!(session.camera().position, camera_before);
}

#[test]
fn interaction_does_not_rebuild_the_viewport() {
    let (mut session, _, renderer, source) = mount(800, 600);
    session.frame();
    session.handle_event(HostEvent::PointerDown { x: 0.0, y: 0.0 });
    session.frame();

    assert!(!renderer.log.borrow().disposed);
    assert_eq!(renderer.log.borrow().sizes.len(), 1);
    assert_eq!(source.requested.borrow().len(), 1);
    assert!(session.is_loading());

    // the original fetch is still the live one
    assert!(source.resolve(Ok(off_center_model())));
    session.frame();
    assert_eq!(session.scene().model_count(), 1);
}

#[test]
fn teardown_silences_loop_listeners_and_late_fetch() {
    let (mut session, surface, renderer, source) = mount(800, 600);
    session.frame();
    session.teardown();

    assert!(!session.is_active());
    assert!(session.listeners().is_empty());
    assert!(session.controls().is_disposed());
    assert!(renderer.log.borrow().disposed);

    let renders = renderer.log.borrow().renders;
    let requests = surface.frame_requests.get();
    surface.set_size(400, 400);

    assert!(!session.frame());
    assert!(!session.handle_event(HostEvent::Resize));
    assert!(!session.handle_event(HostEvent::Wheel { notches: 1.0 }));
    assert!(!session.has_interacted());
    assert_eq!(renderer.log.borrow().renders, renders);
    assert_eq!(surface.frame_requests.get(), requests);
    assert_eq!(session.camera().aspect, 800.0 / 600.0);

    // a fetch resolving after teardown finds nobody listening
    assert!(!source.resolve(Ok(off_center_model())));
    session.poll_asset();
    assert_eq!(session.scene().model_count(), 0);

    session.teardown();
}

#[test]
fn dropping_the_session_tears_it_down() {
    let (session, _, renderer, _) = mount(800, 600);
    drop(session);
    assert!(renderer.log.borrow().disposed);
}

#[test]
fn theme_sets_clear_color() {
    let (mut session, _, renderer, _) = mount(800, 600);
    session.apply_theme(Theme::Dark);
    assert_eq!(renderer.log.borrow().clear_color, Some(Theme::Dark.background()));
}

#[test]
fn scenario_mount_resize_wheel() {
    let (mut session, surface, renderer, source) = mount(800, 600);
    assert_relative_eq!(session.camera().aspect, 1.3333, epsilon = 1e-4);

    surface.set_size(400, 400);
    session.handle_event(HostEvent::Resize);
    assert_eq!(session.camera().aspect, 1.0);
    assert_eq!(
        renderer.log.borrow().sizes.last(),
        Some(&LogicalSize::new(400, 400))
    );

    source.resolve(Ok(off_center_model()));
    session.frame();
    session.handle_event(HostEvent::Wheel { notches: -1.0 });
    assert!(session.has_interacted());

    let yaw = model_yaw(&session);
    session.frame();
    session.frame();
    assert_eq!(model_yaw(&session), yaw);
}
