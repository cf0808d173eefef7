pub mod input;
pub mod store;

pub use input::{apply_action, InputAction, InputState};
pub use store::{DimensionsPatch, FurniturePatch, RoomStore};

use crate::config::EditorConfig;
use crate::render::{FrameStats, PointerEvent, RenderContext, RenderError, SurfaceHost, SyncReport};
use crate::scene::RoomDimensions;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use winit::event::WindowEvent;

type PendingSelection = Rc<RefCell<Option<Option<String>>>>;

/// Glues the room store to the lifecycle manager: syncs the scene whenever
/// the store changed, feeds input through, and writes picks back into the
/// store's selection.
pub struct Editor<H: SurfaceHost> {
    store: RoomStore,
    context: RenderContext<H>,
    input: InputState,
    picked: PendingSelection,
    synced_revision: Option<u64>,
    framed_dimensions: Option<RoomDimensions>,
}

impl<H: SurfaceHost> Editor<H> {
    pub fn new(host: H, config: EditorConfig, store: RoomStore) -> Self {
        let mut context = RenderContext::new(host, config);
        let picked: PendingSelection = Rc::default();
        let sink = Rc::clone(&picked);
        context.set_on_furniture_selected(move |id| {
            *sink.borrow_mut() = Some(id.map(str::to_string));
        });
        Self {
            store,
            context,
            input: InputState::default(),
            picked,
            synced_revision: None,
            framed_dimensions: None,
        }
    }

    pub fn start(&mut self) -> Result<(), RenderError> {
        let dims = self.store.room().dimensions();
        self.context.initialize(dims)?;
        self.framed_dimensions = Some(dims);
        self.synced_revision = None;
        self.sync_if_changed();
        Ok(())
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    /// Mutable store access. Changes are picked up by the next frame.
    pub fn store_mut(&mut self) -> &mut RoomStore {
        &mut self.store
    }

    pub fn context(&self) -> &RenderContext<H> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<H> {
        &mut self.context
    }

    /// Pushes store changes into the scene. Returns `None` when the scene
    /// was already current.
    pub fn sync_if_changed(&mut self) -> Option<SyncReport> {
        self.apply_picked();
        if self.synced_revision == Some(self.store.revision()) {
            return None;
        }
        let dims = self.store.room().dimensions();
        if self.framed_dimensions != Some(dims) {
            self.context.update_room_dimensions(dims);
            self.framed_dimensions = Some(dims);
        }
        let report = self
            .context
            .sync_room(self.store.room(), self.store.selected());
        self.synced_revision = Some(self.store.revision());
        Some(report)
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<String> {
        let action = self.input.handle_window_event(event)?;
        self.apply(action)
    }

    pub fn click(&mut self, event: &PointerEvent) -> Option<String> {
        self.apply(InputAction::Click(*event))
    }

    fn apply(&mut self, action: InputAction) -> Option<String> {
        let picked = apply_action(&mut self.context, action);
        self.apply_picked();
        picked
    }

    fn apply_picked(&mut self) {
        if let Some(selection) = self.picked.borrow_mut().take() {
            self.store.set_selected(selection.as_deref());
        }
    }

    /// One animation frame with any pending store changes synced first.
    pub fn frame(&mut self) -> Option<FrameStats> {
        self.sync_if_changed();
        self.context.animation_frame()
    }

    pub fn capture_png(&self, path: &Path) -> Result<(), RenderError> {
        self.context.capture_png(path)
    }

    pub fn stop(&mut self) {
        self.context.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessHost;
    use crate::scene::PrimitiveShape;
    use glam::{Vec2, Vec3};

    fn editor() -> Editor<HeadlessHost> {
        let mut editor = Editor::new(
            HeadlessHost::new(640, 480),
            EditorConfig::default(),
            RoomStore::new(),
        );
        editor.start().unwrap();
        editor
    }

    #[test]
    fn start_syncs_the_initial_room() {
        let editor = editor();
        assert_eq!(editor.context().registry().unwrap().len(), 4);
    }

    #[test]
    fn store_changes_sync_on_next_frame() {
        let mut editor = editor();
        let id = editor.store_mut().add_primitive(PrimitiveShape::Cube);
        editor.frame().unwrap();
        let registry = editor.context().registry().unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.selected_ids().collect::<Vec<_>>(), vec![id.as_str()]);
        assert!(editor.sync_if_changed().is_none());
    }

    #[test]
    fn room_resize_reframes_camera() {
        let mut editor = editor();
        editor.store_mut().update_room_dimensions(DimensionsPatch {
            width: Some(300.0),
            depth: Some(300.0),
            height: Some(300.0),
        });
        editor.sync_if_changed().unwrap();
        let camera = editor.context().camera().unwrap();
        assert_eq!(camera.target, Vec3::new(150.0, 150.0, 150.0));
    }

    #[test]
    fn picks_update_store_selection() {
        let mut editor = editor();
        // The table: 100x75x100 at (400, 0, 300).
        let center = Vec3::new(450.0, 37.5, 350.0);
        let ndc = editor.context().camera().unwrap().project(center);
        let position = editor.context().host().bounds().from_ndc(Vec2::new(ndc.x, ndc.y));
        let picked = editor.click(&PointerEvent::click(position.x, position.y));
        assert_eq!(picked.as_deref(), Some("2"));
        assert_eq!(editor.store().selected(), Some("2"));

        let corner = editor.context().host().bounds().from_ndc(Vec2::new(0.95, 0.95));
        editor.click(&PointerEvent::click(corner.x, corner.y));
        assert_eq!(editor.store().selected(), None);
    }
}
