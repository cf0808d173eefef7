pub mod camera;
pub mod dispose;
pub mod envelope;
pub mod geometry;
pub mod host;
pub mod lod;
pub mod mesh_factory;
pub mod pick;
pub mod raster;
pub mod registry;
pub mod sync;

pub use camera::{room_framing, OrbitControls, PerspectiveCamera};
pub use dispose::{dispose, dispose_all, DisposeReport};
pub use envelope::{RoomEnvelope, WallSide};
pub use host::{CanvasId, FrameRequest, HeadlessHost, ListenerId, ListenerKind, SurfaceHost};
pub use lod::update_lod;
pub use mesh_factory::{FurnitureNode, MeshFactory, NodeShape};
pub use pick::{PickHit, PointerEvent, SurfaceBounds};
pub use raster::{FrameStats, Lighting, RasterRenderer};
pub use registry::{NodeRegistry, RegistryEntry};
pub use sync::{reconcile, SyncReport};

use crate::catalog::Catalog;
use crate::config::EditorConfig;
use crate::engine::{Engine, Scene};
use crate::scene::{Furniture, Room, RoomDimensions};
use std::path::Path;
use winit::dpi::PhysicalSize;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid room dimensions {width}x{depth}x{height}")]
    InvalidDimensions { width: f32, depth: f32, height: f32 },
    #[error("render surface has no area ({width}x{height})")]
    InvalidSurface { width: u32, height: u32 },
    #[error("scene is not initialized")]
    NotInitialized,
    #[error("renderer was disposed")]
    Disposed,
    #[error("failed creating capture directory '{path}': {source}")]
    CaptureDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing capture '{path}': {source}")]
    Capture {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Invoked with the picked furniture id, or `None` for a click on empty space.
pub type SelectionCallback = Box<dyn FnMut(Option<&str>)>;

/// Everything one initialized editor scene owns.
struct LiveScene {
    engine: Engine,
    scene: Scene,
    registry: NodeRegistry,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: RasterRenderer,
    lighting: Lighting,
    envelope: RoomEnvelope,
    canvas: CanvasId,
    frame: Option<FrameRequest>,
    listeners: Vec<ListenerId>,
}

/// Scene lifecycle manager: owns the camera, renderer, lights, controls,
/// room envelope, furniture nodes and the animation loop for one surface.
pub struct RenderContext<H: SurfaceHost> {
    host: H,
    config: EditorConfig,
    catalog: &'static Catalog,
    live: Option<LiveScene>,
    on_furniture_selected: Option<SelectionCallback>,
    next_canvas: u64,
}

impl<H: SurfaceHost> RenderContext<H> {
    pub fn new(host: H, config: EditorConfig) -> Self {
        Self::with_catalog(host, config, Catalog::builtin())
    }

    pub fn with_catalog(host: H, config: EditorConfig, catalog: &'static Catalog) -> Self {
        Self {
            host,
            config,
            catalog,
            live: None,
            on_furniture_selected: None,
            next_canvas: 1,
        }
    }

    pub fn set_on_furniture_selected(&mut self, callback: impl FnMut(Option<&str>) + 'static) {
        self.on_furniture_selected = Some(Box::new(callback));
    }

    // ====================================================================
    // Lifecycle
    // ====================================================================

    /// Builds camera, renderer, lights, controls and the room envelope on the
    /// host surface, then schedules the first frame. Any previous scene is
    /// torn down first.
    pub fn initialize(&mut self, dimensions: RoomDimensions) -> Result<(), RenderError> {
        self.teardown();

        if !dimensions.is_valid() {
            return Err(RenderError::InvalidDimensions {
                width: dimensions.width,
                depth: dimensions.depth,
                height: dimensions.height,
            });
        }
        let dims = dimensions.clamped();
        if dims != dimensions {
            log::warn!(
                "Room dimensions {}x{}x{} out of range; using {}x{}x{}",
                dimensions.width,
                dimensions.depth,
                dimensions.height,
                dims.width,
                dims.depth,
                dims.height
            );
        }

        let size = self.host.size();
        let mut renderer = RasterRenderer::new(size.width, size.height, self.config.clear_color)?;
        renderer.set_clear_color(self.config.clear_color);

        let mut camera = PerspectiveCamera::from_config(&self.config, 1.0);
        camera.set_aspect(size.width, size.height);
        let (position, target) = room_framing(dims);
        camera.look_at(position, target);
        let controls = OrbitControls::from_config(&self.config, target);

        let mut engine = Engine::new();
        let mut scene = Scene::new(self.config.clear_color);
        let envelope = RoomEnvelope::build(&mut engine, &mut scene, dims, &self.config);
        let lighting = Lighting::for_room(dims, &self.config);

        let canvas = CanvasId(self.next_canvas);
        self.next_canvas += 1;
        self.host.attach_canvas(canvas);
        let listeners = vec![
            self.host.add_listener(ListenerKind::Click),
            self.host.add_listener(ListenerKind::Resize),
        ];
        let frame = Some(self.host.request_animation_frame());

        log::info!(
            "Scene initialized: room {}x{}x{}, surface {}x{}",
            dims.width,
            dims.depth,
            dims.height,
            size.width,
            size.height
        );
        self.live = Some(LiveScene {
            engine,
            scene,
            registry: NodeRegistry::new(),
            camera,
            controls,
            renderer,
            lighting,
            envelope,
            canvas,
            frame,
            listeners,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    /// Follows a new surface size. Does nothing before initialization or for
    /// a collapsed surface.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            log::debug!("Ignoring resize to {}x{}", size.width, size.height);
            return;
        }
        live.camera.set_aspect(size.width, size.height);
        if let Err(err) = live.renderer.set_viewport(size.width, size.height) {
            log::warn!("Viewport resize failed: {err}");
        }
    }

    /// Reframes the camera and rebuilds the envelope for new room dimensions.
    /// Non-finite or non-positive dimensions leave the scene as it is.
    pub fn update_room_dimensions(&mut self, dimensions: RoomDimensions) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if !dimensions.is_valid() {
            log::warn!(
                "Ignoring invalid room dimensions {}x{}x{}",
                dimensions.width,
                dimensions.depth,
                dimensions.height
            );
            return;
        }
        let dims = dimensions.clamped();
        let (position, target) = room_framing(dims);
        live.camera.look_at(position, target);
        live.controls.target = target;
        live.controls.reset_motion();
        live.lighting = Lighting::for_room(dims, &self.config);

        let released = live.envelope.dispose(&mut live.engine, &mut live.scene);
        live.envelope = RoomEnvelope::build(&mut live.engine, &mut live.scene, dims, &self.config);
        log::info!(
            "Room resized to {}x{}x{} ({} envelope nodes replaced)",
            dims.width,
            dims.depth,
            dims.height,
            released.nodes
        );
    }

    /// Stops the loop, drops listeners, frees every node and detaches the
    /// canvas. Safe to call any number of times.
    pub fn teardown(&mut self) {
        let Some(mut live) = self.live.take() else {
            return;
        };
        if let Some(frame) = live.frame.take() {
            self.host.cancel_animation_frame(frame);
        }
        for listener in live.listeners.drain(..) {
            self.host.remove_listener(listener);
        }
        let furniture = sync::clear_all(&mut live.engine, &mut live.scene, &mut live.registry);
        let envelope = live.envelope.dispose(&mut live.engine, &mut live.scene);
        live.renderer.dispose();
        self.host.detach_canvas(live.canvas);
        log::info!(
            "Scene torn down: {} furniture nodes and {} envelope nodes released",
            furniture.nodes,
            envelope.nodes
        );
    }

    // ====================================================================
    // Furniture
    // ====================================================================

    /// Brings furniture nodes in line with `furniture` and the selection.
    pub fn sync(&mut self, furniture: &[Furniture], selected_id: Option<&str>) -> SyncReport {
        let Some(live) = self.live.as_mut() else {
            return SyncReport::default();
        };
        let factory = MeshFactory::new(self.catalog, &self.config);
        reconcile(
            &mut live.engine,
            &mut live.scene,
            &mut live.registry,
            &factory,
            furniture,
            selected_id,
        )
    }

    pub fn sync_room(&mut self, room: &Room, selected_id: Option<&str>) -> SyncReport {
        self.sync(&room.furniture, selected_id)
    }

    /// Picks under the pointer and reports the result through the selection
    /// callback exactly once. Non-primary buttons are ignored.
    pub fn handle_click(&mut self, event: &PointerEvent) -> Option<String> {
        let live = self.live.as_ref()?;
        if event.button != winit::event::MouseButton::Left {
            return None;
        }
        let bounds = self.host.bounds();
        if !bounds.contains(event.position) {
            return None;
        }
        let picked = pick::pick(event, &bounds, &live.camera, &live.engine, &live.registry);
        if let Some(callback) = self.on_furniture_selected.as_mut() {
            callback(picked.as_deref());
        }
        picked
    }

    // ====================================================================
    // Frame loop
    // ====================================================================

    /// Runs one scheduled animation frame: LOD selection, damped controls,
    /// render, then schedules the next frame. `None` when nothing was
    /// scheduled.
    pub fn animation_frame(&mut self) -> Option<FrameStats> {
        let live = self.live.as_mut()?;
        live.frame.take()?;

        update_lod(&mut live.engine, live.registry.lod_roots(), live.camera.position);
        live.controls.update(&mut live.camera);
        let stats = live
            .renderer
            .render(&live.engine, &live.scene, &live.camera, &live.lighting);

        live.frame = Some(self.host.request_animation_frame());
        Some(stats)
    }

    pub fn capture_png(&self, path: &Path) -> Result<(), RenderError> {
        let live = self.live.as_ref().ok_or(RenderError::NotInitialized)?;
        live.renderer.capture_png(path)
    }

    // ====================================================================
    // Accessors
    // ====================================================================

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn engine(&self) -> Option<&Engine> {
        self.live.as_ref().map(|live| &live.engine)
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.live.as_ref().map(|live| &live.scene)
    }

    pub fn registry(&self) -> Option<&NodeRegistry> {
        self.live.as_ref().map(|live| &live.registry)
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.live.as_ref().map(|live| &live.camera)
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.live.as_mut().map(|live| &mut live.controls)
    }

    /// Controls together with the camera, for pan gestures that need both.
    pub fn camera_controls_mut(&mut self) -> Option<(&PerspectiveCamera, &mut OrbitControls)> {
        self.live
            .as_mut()
            .map(|live| (&live.camera, &mut live.controls))
    }

    pub fn envelope(&self) -> Option<&RoomEnvelope> {
        self.live.as_ref().map(|live| &live.envelope)
    }

    pub fn lighting(&self) -> Option<&Lighting> {
        self.live.as_ref().map(|live| &live.lighting)
    }

    pub fn renderer(&self) -> Option<&RasterRenderer> {
        self.live.as_ref().map(|live| &live.renderer)
    }
}

impl<H: SurfaceHost> Drop for RenderContext<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::engine::NodeKind;
    use crate::scene::{FurnitureKind, PrimitiveShape, Vector3};
    use glam::{Vec2, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> RenderContext<HeadlessHost> {
        RenderContext::new(HeadlessHost::new(320, 240), EditorConfig::default())
    }

    fn dims(w: f32, d: f32, h: f32) -> RoomDimensions {
        RoomDimensions::new(w, d, h)
    }

    fn cube(id: &str, x: f32, z: f32) -> Furniture {
        Furniture {
            id: id.into(),
            name: id.into(),
            kind: FurnitureKind::Primitive(PrimitiveShape::Cube),
            position: Vector3::new(x, 0.0, z),
            dimensions: Vector3::new(80.0, 80.0, 80.0),
            color: Color::from_u32(0x336699),
            rotation: 0.0,
        }
    }

    fn click_on(ctx: &RenderContext<HeadlessHost>, world: Vec3) -> PointerEvent {
        let ndc = ctx.camera().unwrap().project(world);
        let bounds = ctx.host().bounds();
        let position = bounds.from_ndc(Vec2::new(ndc.x, ndc.y));
        PointerEvent::click(position.x, position.y)
    }

    #[test]
    fn initialize_frames_the_room() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        let camera = ctx.camera().unwrap();
        assert_eq!(camera.position, Vec3::new(400.0, 420.0, 1200.0));
        assert_eq!(camera.target, Vec3::new(400.0, 140.0, 300.0));
        approx::assert_relative_eq!(camera.aspect, 320.0 / 240.0);
        assert_eq!(ctx.envelope().unwrap().len(), 6);
        assert_eq!(ctx.host().canvases().len(), 1);
        assert_eq!(ctx.host().listener_count(), 2);
        assert!(ctx.host().pending_frame().is_some());
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let mut ctx = context();
        let err = ctx.initialize(dims(f32::NAN, 600.0, 280.0)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidDimensions { .. }));
        assert!(!ctx.is_initialized());
    }

    #[test]
    fn collapsed_surface_is_rejected() {
        let mut ctx = RenderContext::new(HeadlessHost::new(0, 240), EditorConfig::default());
        let err = ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSurface { width: 0, .. }));
        assert!(ctx.host().canvases().is_empty());
    }

    #[test]
    fn reinitialize_tears_down_the_previous_scene() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        ctx.sync(&[cube("a", 0.0, 0.0)], None);
        ctx.initialize(dims(500.0, 500.0, 250.0)).unwrap();
        assert_eq!(ctx.host().canvases().len(), 1);
        assert_eq!(ctx.host().listener_count(), 2);
        assert!(ctx.registry().unwrap().is_empty());
        assert_eq!(ctx.host().frames_cancelled(), 1);
    }

    #[test]
    fn handles_missing_before_initialize_are_no_ops() {
        let mut ctx = context();
        ctx.resize(PhysicalSize::new(100, 100));
        ctx.update_room_dimensions(dims(300.0, 300.0, 300.0));
        assert_eq!(ctx.sync(&[cube("a", 0.0, 0.0)], None), SyncReport::default());
        assert_eq!(ctx.handle_click(&PointerEvent::click(10.0, 10.0)), None);
        assert!(ctx.animation_frame().is_none());
        assert!(matches!(
            ctx.capture_png(Path::new("never.png")),
            Err(RenderError::NotInitialized)
        ));
        ctx.teardown();
    }

    #[test]
    fn resize_updates_aspect_and_viewport() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        ctx.resize(PhysicalSize::new(400, 100));
        approx::assert_relative_eq!(ctx.camera().unwrap().aspect, 4.0);
        assert_eq!(ctx.renderer().unwrap().viewport(), (400, 100));
        ctx.resize(PhysicalSize::new(0, 100));
        assert_eq!(ctx.renderer().unwrap().viewport(), (400, 100));
    }

    #[test]
    fn room_resize_round_trip_keeps_envelope_count() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        let baseline_nodes = ctx.engine().unwrap().live_nodes();

        for _ in 0..2 {
            ctx.update_room_dimensions(dims(300.0, 300.0, 300.0));
            assert_eq!(ctx.envelope().unwrap().len(), 6);
            assert_eq!(ctx.scene().unwrap().len(), 6);
            assert_eq!(ctx.camera().unwrap().target, Vec3::new(150.0, 150.0, 150.0));
            assert_eq!(ctx.camera().unwrap().position, Vec3::new(150.0, 450.0, 600.0));

            ctx.update_room_dimensions(dims(800.0, 600.0, 280.0));
            assert_eq!(ctx.envelope().unwrap().len(), 6);
            assert_eq!(ctx.camera().unwrap().target, Vec3::new(400.0, 140.0, 300.0));
        }
        assert_eq!(ctx.engine().unwrap().live_nodes(), baseline_nodes);
    }

    #[test]
    fn invalid_resize_keeps_the_current_envelope() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        let floor = ctx.envelope().unwrap().floor();
        for bad in [dims(f32::NAN, 600.0, 280.0), dims(800.0, f32::INFINITY, 280.0), dims(800.0, 600.0, 0.0)] {
            ctx.update_room_dimensions(bad);
            assert_eq!(ctx.envelope().unwrap().dimensions(), Some(dims(800.0, 600.0, 280.0)));
            assert_eq!(ctx.envelope().unwrap().floor(), floor);
            assert_eq!(ctx.camera().unwrap().target, Vec3::new(400.0, 140.0, 300.0));
        }
    }

    #[test]
    fn envelope_rebuilds_at_boundary_dimensions() {
        let mut ctx = context();
        ctx.initialize(dims(100.0, 100.0, 100.0)).unwrap();
        ctx.update_room_dimensions(dims(1000.0, 1000.0, 1000.0));
        assert_eq!(
            ctx.envelope().unwrap().dimensions(),
            Some(dims(1000.0, 1000.0, 1000.0))
        );
        ctx.update_room_dimensions(dims(100.0, 100.0, 100.0));
        assert_eq!(ctx.envelope().unwrap().dimensions(), Some(dims(100.0, 100.0, 100.0)));
    }

    #[test]
    fn click_reports_selection_once() {
        let mut ctx = context();
        let calls: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
        let sink = Rc::clone(&calls);
        ctx.set_on_furniture_selected(move |id| sink.borrow_mut().push(id.map(str::to_string)));
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        ctx.sync(&[cube("a", 300.0, 200.0)], None);

        let hit = click_on(&ctx, Vec3::new(340.0, 40.0, 240.0));
        assert_eq!(ctx.handle_click(&hit).as_deref(), Some("a"));
        let miss = click_on(&ctx, Vec3::new(700.0, 0.0, 550.0));
        assert_eq!(ctx.handle_click(&miss), None);

        assert_eq!(*calls.borrow(), vec![Some("a".to_string()), None]);

        // Outside the displayed surface nothing reaches picking.
        assert_eq!(ctx.handle_click(&PointerEvent::click(-5.0, 10.0)), None);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn animation_frame_renders_and_reschedules() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        ctx.sync(&[cube("a", 300.0, 200.0)], Some("a"));
        let first = ctx.host().pending_frame();

        let stats = ctx.animation_frame().unwrap();
        assert_eq!(stats.meshes, 6);
        assert_eq!(stats.line_nodes, 2);
        assert_ne!(ctx.host().pending_frame(), first);
        assert_eq!(ctx.renderer().unwrap().frames_rendered(), 1);
    }

    #[test]
    fn far_models_switch_to_coarse_level() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        let chair = Furniture {
            kind: FurnitureKind::CatalogModel("chair".into()),
            dimensions: Vector3::new(55.0, 50.0, 55.0),
            ..cube("c", 100.0, 50.0)
        };
        ctx.sync(&[chair], None);
        ctx.animation_frame().unwrap();

        let registry = ctx.registry().unwrap();
        let entry = registry.get("c").unwrap();
        let NodeShape::Model { far, .. } = entry.node.shape else {
            panic!("expected model");
        };
        match &ctx.engine().unwrap().node(entry.node.root).unwrap().kind {
            NodeKind::Lod(levels) => assert_eq!(levels.active(), Some(far)),
            other => panic!("expected lod, got {other:?}"),
        }
    }

    #[test]
    fn teardown_releases_everything_and_is_idempotent() {
        let mut ctx = context();
        ctx.initialize(dims(800.0, 600.0, 280.0)).unwrap();
        ctx.sync(&[cube("a", 0.0, 0.0), cube("b", 200.0, 0.0)], Some("b"));
        ctx.animation_frame();

        ctx.teardown();
        assert!(!ctx.is_initialized());
        assert!(ctx.host().canvases().is_empty());
        assert_eq!(ctx.host().listener_count(), 0);
        assert_eq!(ctx.host().pending_frame(), None);

        ctx.teardown();
        assert_eq!(ctx.host().frames_cancelled(), 1);
    }
}
