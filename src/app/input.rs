use crate::render::{PointerEvent, RenderContext, SurfaceHost};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pointer travel, in pixels, beyond which a press no longer counts as a click.
const CLICK_SLOP_PX: f64 = 4.0;
/// Dolly factor per wheel line.
const ZOOM_STEP: f32 = 0.95;
const PIXELS_PER_LINE: f32 = 40.0;
/// Orbit angle per arrow key press.
const KEY_ROTATE_RAD: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Press and release without dragging.
    Click(PointerEvent),
    /// Left drag, in pixels.
    Orbit { dx: f32, dy: f32 },
    /// Right or middle drag, in pixels.
    Pan { dx: f32, dy: f32 },
    /// Dolly factor; below one moves closer.
    Zoom(f32),
    /// Orbit by angle, from the keyboard.
    Rotate { left: f32, up: f32 },
    Resize(PhysicalSize<u32>),
}

#[derive(Debug, Clone, Copy)]
struct Press {
    button: MouseButton,
    origin: PhysicalPosition<f64>,
    dragging: bool,
}

/// Turns window events into editor actions. Drags orbit or pan; a press
/// released near where it started is a click routed to picking.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    cursor: Option<PhysicalPosition<f64>>,
    press: Option<Press>,
}

impl InputState {
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(*position),
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.press = None;
                None
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse_input(*state, *button),
            WindowEvent::MouseWheel { delta, .. } => self.mouse_wheel(*delta),
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event.physical_key, event.state == ElementState::Pressed)
            }
            WindowEvent::Resized(size) => Some(InputAction::Resize(*size)),
            _ => None,
        }
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<InputAction> {
        let previous = self.cursor.replace(position);
        let press = self.press.as_mut()?;
        if !press.dragging {
            let (dx, dy) = (position.x - press.origin.x, position.y - press.origin.y);
            if (dx * dx + dy * dy).sqrt() <= CLICK_SLOP_PX {
                return None;
            }
            press.dragging = true;
        }
        let previous = previous.unwrap_or(press.origin);
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        match press.button {
            MouseButton::Left => Some(InputAction::Orbit { dx, dy }),
            MouseButton::Right | MouseButton::Middle => Some(InputAction::Pan { dx, dy }),
            _ => None,
        }
    }

    pub fn mouse_input(&mut self, state: ElementState, button: MouseButton) -> Option<InputAction> {
        match state {
            ElementState::Pressed => {
                let origin = self.cursor?;
                self.press = Some(Press {
                    button,
                    origin,
                    dragging: false,
                });
                None
            }
            ElementState::Released => {
                let press = self.press.take()?;
                if press.button != button || press.dragging {
                    return None;
                }
                Some(InputAction::Click(PointerEvent {
                    position: self.cursor.unwrap_or(press.origin),
                    button,
                }))
            }
        }
    }

    pub fn mouse_wheel(&mut self, delta: MouseScrollDelta) -> Option<InputAction> {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
        };
        if lines == 0.0 {
            return None;
        }
        Some(InputAction::Zoom(ZOOM_STEP.powf(lines)))
    }

    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> Option<InputAction> {
        if !pressed {
            return None;
        }
        let (left, up) = match key {
            PhysicalKey::Code(KeyCode::ArrowLeft) => (KEY_ROTATE_RAD, 0.0),
            PhysicalKey::Code(KeyCode::ArrowRight) => (-KEY_ROTATE_RAD, 0.0),
            PhysicalKey::Code(KeyCode::ArrowUp) => (0.0, KEY_ROTATE_RAD),
            PhysicalKey::Code(KeyCode::ArrowDown) => (0.0, -KEY_ROTATE_RAD),
            _ => return None,
        };
        Some(InputAction::Rotate { left, up })
    }
}

/// Routes one action into the lifecycle manager. Returns the picked id for
/// clicks.
pub fn apply_action<H: SurfaceHost>(
    context: &mut RenderContext<H>,
    action: InputAction,
) -> Option<String> {
    let height = context.host().size().height.max(1) as f32;
    match action {
        InputAction::Click(event) => return context.handle_click(&event),
        InputAction::Orbit { dx, dy } => {
            if let Some(controls) = context.controls_mut() {
                let full_turn = std::f32::consts::TAU / height;
                controls.rotate_left(dx * full_turn);
                controls.rotate_up(dy * full_turn);
            }
        }
        InputAction::Pan { dx, dy } => {
            if let Some((camera, controls)) = context.camera_controls_mut() {
                let distance = camera.position.distance(camera.target);
                let world_per_pixel = 2.0 * distance * (camera.fov_deg.to_radians() / 2.0).tan() / height;
                controls.pan(camera, -dx * world_per_pixel, dy * world_per_pixel);
            }
        }
        InputAction::Zoom(factor) => {
            if let Some(controls) = context.controls_mut() {
                controls.dolly(factor);
            }
        }
        InputAction::Rotate { left, up } => {
            if let Some(controls) = context.controls_mut() {
                controls.rotate_left(left);
                controls.rotate_up(up);
            }
        }
        InputAction::Resize(size) => context.resize(size),
    }
    None
}
