//! Gamepad and keyboard → console button bits.
//!
//! Gamepad buttons use the console's face layout: A on the right, B at the
//! bottom, X at the top, Y on the left.
//!
//! Default keyboard mapping:
//! - Arrows → D-pad
//! - X → A, Z → B, S → X, A → Y
//! - Q / W → L / R
//! - Enter → Plus, Right Shift → Minus

use gilrs::{Axis, Button, Event, GamepadId, Gilrs};
use nx_port::host::Controller;
use nx_port::input::button;
use tracing::{debug, warn};
use winit::keyboard::KeyCode;

const AXIS_THRESHOLD: f32 = 0.5;

/// Gamepad buttons polled every scan.
const GAMEPAD_BUTTONS: [Button; 16] = [
    Button::East,
    Button::South,
    Button::North,
    Button::West,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Start,
    Button::Select,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Map a host key to a console button bit.
///
/// Returns `None` for unmapped keys.
#[must_use]
pub fn map_keycode(key: KeyCode) -> Option<u64> {
    match key {
        KeyCode::ArrowUp => Some(button::DUP),
        KeyCode::ArrowDown => Some(button::DDOWN),
        KeyCode::ArrowLeft => Some(button::DLEFT),
        KeyCode::ArrowRight => Some(button::DRIGHT),
        KeyCode::KeyX => Some(button::A),
        KeyCode::KeyZ => Some(button::B),
        KeyCode::KeyS => Some(button::X),
        KeyCode::KeyA => Some(button::Y),
        KeyCode::KeyQ => Some(button::L),
        KeyCode::KeyW => Some(button::R),
        KeyCode::Enter => Some(button::PLUS),
        KeyCode::ShiftRight => Some(button::MINUS),
        _ => None,
    }
}

/// Map a gamepad button to a console button bit.
#[must_use]
pub fn map_button(pad_button: Button) -> Option<u64> {
    match pad_button {
        Button::East => Some(button::A),
        Button::South => Some(button::B),
        Button::North => Some(button::X),
        Button::West => Some(button::Y),
        Button::LeftTrigger => Some(button::L),
        Button::RightTrigger => Some(button::R),
        Button::LeftTrigger2 => Some(button::ZL),
        Button::RightTrigger2 => Some(button::ZR),
        Button::Start => Some(button::PLUS),
        Button::Select => Some(button::MINUS),
        Button::LeftThumb => Some(button::LSTICK),
        Button::RightThumb => Some(button::RSTICK),
        Button::DPadUp => Some(button::DUP),
        Button::DPadDown => Some(button::DDOWN),
        Button::DPadLeft => Some(button::DLEFT),
        Button::DPadRight => Some(button::DRIGHT),
        _ => None,
    }
}

/// Buttons newly held and newly released between two scans.
#[must_use]
pub const fn edges(previous: u64, current: u64) -> (u64, u64) {
    (current & !previous, previous & !current)
}

pub struct GilrsController {
    gilrs: Option<Gilrs>,
    active: Option<GamepadId>,
    keyboard: u64,
    held: u64,
    down: u64,
    up: u64,
}

impl GilrsController {
    /// Keyboard plus the first gamepad that reports an event.
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(gilrs) => Some(gilrs),
            Err(e) => {
                warn!("gamepad support unavailable: {e}");
                None
            }
        };
        Self::with_gilrs(gilrs)
    }

    /// Keyboard only.
    #[must_use]
    pub fn keyboard_only() -> Self {
        Self::with_gilrs(None)
    }

    fn with_gilrs(gilrs: Option<Gilrs>) -> Self {
        Self {
            gilrs,
            active: None,
            keyboard: 0,
            held: 0,
            down: 0,
            up: 0,
        }
    }

    /// Record a host key change; takes effect at the next `scan`.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some(bit) = map_keycode(key) {
            if pressed {
                self.keyboard |= bit;
            } else {
                self.keyboard &= !bit;
            }
        }
    }

    fn gamepad_bits(&mut self) -> u64 {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return 0;
        };
        while let Some(Event { id, .. }) = gilrs.next_event() {
            if self.active != Some(id) {
                debug!(gamepad = ?id, "gamepad active");
            }
            self.active = Some(id);
        }
        let Some(gamepad) = self.active.and_then(|id| gilrs.connected_gamepad(id)) else {
            return 0;
        };

        let mut bits = GAMEPAD_BUTTONS
            .iter()
            .filter(|&&b| gamepad.is_pressed(b))
            .filter_map(|&b| map_button(b))
            .fold(0, |acc, bit| acc | bit);

        // Left stick doubles as the D-pad.
        if let Some(axis) = gamepad.axis_data(Axis::LeftStickX) {
            if axis.value() > AXIS_THRESHOLD {
                bits |= button::DRIGHT;
            } else if axis.value() < -AXIS_THRESHOLD {
                bits |= button::DLEFT;
            }
        }
        if let Some(axis) = gamepad.axis_data(Axis::LeftStickY) {
            if axis.value() > AXIS_THRESHOLD {
                bits |= button::DUP;
            } else if axis.value() < -AXIS_THRESHOLD {
                bits |= button::DDOWN;
            }
        }
        bits
    }
}

impl Default for GilrsController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for GilrsController {
    fn scan(&mut self) {
        let current = self.keyboard | self.gamepad_bits();
        (self.down, self.up) = edges(self.held, current);
        self.held = current;
    }

    fn keys_down(&self) -> u64 {
        self.down
    }

    fn keys_up(&self) -> u64 {
        self.up
    }
}
