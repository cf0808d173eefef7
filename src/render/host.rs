//! The surface the editor renders into.
//!
//! A host owns the displayed rectangle, accepts the renderer's canvas,
//! schedules animation frames and carries input listeners. The lifecycle
//! manager only talks to this trait, so a window, an embedding widget or the
//! headless driver can all stand behind it.

use crate::render::pick::SurfaceBounds;
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Click,
    Resize,
}

pub trait SurfaceHost {
    /// Displayed rectangle of the surface in window pixels.
    fn bounds(&self) -> SurfaceBounds;

    fn size(&self) -> PhysicalSize<u32> {
        self.bounds().size
    }

    fn attach_canvas(&mut self, canvas: CanvasId);
    /// Returns `false` when the canvas was not attached.
    fn detach_canvas(&mut self, canvas: CanvasId) -> bool;

    fn request_animation_frame(&mut self) -> FrameRequest;
    fn cancel_animation_frame(&mut self, request: FrameRequest);

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId) -> bool;
}

/// In-memory host for the CLI driver and tests. Records what the lifecycle
/// manager attached and scheduled so it can be inspected afterwards.
#[derive(Debug)]
pub struct HeadlessHost {
    bounds: SurfaceBounds,
    canvases: Vec<CanvasId>,
    pending_frame: Option<FrameRequest>,
    listeners: Vec<(ListenerId, ListenerKind)>,
    next_id: u64,
    frames_requested: u64,
    frames_cancelled: u64,
}

impl HeadlessHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_bounds(SurfaceBounds::new(0.0, 0.0, width, height))
    }

    pub fn with_bounds(bounds: SurfaceBounds) -> Self {
        Self {
            bounds,
            canvases: Vec::new(),
            pending_frame: None,
            listeners: Vec::new(),
            next_id: 1,
            frames_requested: 0,
            frames_cancelled: 0,
        }
    }

    /// Changes the displayed size as a layout pass would.
    pub fn set_size(&mut self, size: PhysicalSize<u32>) {
        self.bounds.size = size;
    }

    pub fn set_bounds(&mut self, bounds: SurfaceBounds) {
        self.bounds = bounds;
    }

    pub fn canvases(&self) -> &[CanvasId] {
        &self.canvases
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.iter().any(|(_, k)| *k == kind)
    }

    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }

    pub fn frames_cancelled(&self) -> u64 {
        self.frames_cancelled
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl SurfaceHost for HeadlessHost {
    fn bounds(&self) -> SurfaceBounds {
        self.bounds
    }

    fn attach_canvas(&mut self, canvas: CanvasId) {
        if !self.canvases.contains(&canvas) {
            self.canvases.push(canvas);
        }
    }

    fn detach_canvas(&mut self, canvas: CanvasId) -> bool {
        let before = self.canvases.len();
        self.canvases.retain(|c| *c != canvas);
        self.canvases.len() != before
    }

    fn request_animation_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next());
        self.pending_frame = Some(request);
        self.frames_requested += 1;
        request
    }

    fn cancel_animation_frame(&mut self, request: FrameRequest) {
        if self.pending_frame == Some(request) {
            self.pending_frame = None;
            self.frames_cancelled += 1;
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.push((id, kind));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(candidate, _)| *candidate != id);
        self.listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_replace_and_cancel() {
        let mut host = HeadlessHost::new(800, 600);
        let first = host.request_animation_frame();
        let second = host.request_animation_frame();
        assert_ne!(first, second);
        host.cancel_animation_frame(first);
        assert_eq!(host.pending_frame(), Some(second));
        host.cancel_animation_frame(second);
        assert_eq!(host.pending_frame(), None);
        assert_eq!(host.frames_cancelled(), 1);
    }

    #[test]
    fn canvas_and_listener_bookkeeping() {
        let mut host = HeadlessHost::new(800, 600);
        host.attach_canvas(CanvasId(7));
        host.attach_canvas(CanvasId(7));
        assert_eq!(host.canvases(), &[CanvasId(7)]);
        assert!(host.detach_canvas(CanvasId(7)));
        assert!(!host.detach_canvas(CanvasId(7)));

        let click = host.add_listener(ListenerKind::Click);
        host.add_listener(ListenerKind::Resize);
        assert!(host.remove_listener(click));
        assert!(!host.remove_listener(click));
        assert!(!host.has_listener(ListenerKind::Click));
        assert!(host.has_listener(ListenerKind::Resize));
    }
}
