//! Controller → engine key mapping.
//!
//! Each frame the controller is scanned and the buttons that changed are
//! translated through a fixed table into engine key events.

use crate::host::Controller;

/// Controller button bits as reported by the HID service.
pub mod button {
    pub const A: u64 = 1 << 0;
    pub const B: u64 = 1 << 1;
    pub const X: u64 = 1 << 2;
    pub const Y: u64 = 1 << 3;
    pub const LSTICK: u64 = 1 << 4;
    pub const RSTICK: u64 = 1 << 5;
    pub const L: u64 = 1 << 6;
    pub const R: u64 = 1 << 7;
    pub const ZL: u64 = 1 << 8;
    pub const ZR: u64 = 1 << 9;
    pub const PLUS: u64 = 1 << 10;
    pub const MINUS: u64 = 1 << 11;
    pub const DLEFT: u64 = 1 << 12;
    pub const DUP: u64 = 1 << 13;
    pub const DRIGHT: u64 = 1 << 14;
    pub const DDOWN: u64 = 1 << 15;
}

/// Keys the engine understands from a gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKey {
    Select,
    Start,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    LeftTrigger,
    RightTrigger,
    X,
    Y,
    A,
    B,
}

/// A press or release delivered to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: EngineKey,
    pub pressed: bool,
}

/// Receiver for key events (the engine's key handler).
pub trait KeySink {
    fn key_event(&mut self, key: EngineKey, pressed: bool);
}

impl KeySink for Vec<KeyEvent> {
    fn key_event(&mut self, key: EngineKey, pressed: bool) {
        self.push(KeyEvent { key, pressed });
    }
}

/// Button → key table. Events are emitted in this order.
pub const KEY_TABLE: [(u64, EngineKey); 12] = [
    (button::MINUS, EngineKey::Select),
    (button::PLUS, EngineKey::Start),
    (button::DUP, EngineKey::UpArrow),
    (button::DDOWN, EngineKey::DownArrow),
    (button::DLEFT, EngineKey::LeftArrow),
    (button::DRIGHT, EngineKey::RightArrow),
    (button::L, EngineKey::LeftTrigger),
    (button::R, EngineKey::RightTrigger),
    (button::X, EngineKey::X),
    (button::Y, EngineKey::Y),
    (button::A, EngineKey::A),
    (button::B, EngineKey::B),
];

/// Translate one frame's edges into key events.
///
/// Every mapped button in `down` is pressed. Every mapped button in `up` is
/// released, unless it also appears in `down` (pressed and released within
/// the same scan: the press wins for this frame).
pub fn dispatch<K: KeySink + ?Sized>(down: u64, up: u64, sink: &mut K) {
    for &(bit, key) in &KEY_TABLE {
        if down & bit != 0 {
            sink.key_event(key, true);
        }
    }
    let released = up & !down;
    for &(bit, key) in &KEY_TABLE {
        if released & bit != 0 {
            sink.key_event(key, false);
        }
    }
}

/// Scan `controller` and forward this frame's edges to `sink`.
pub fn pump<C: Controller + ?Sized, K: KeySink + ?Sized>(controller: &mut C, sink: &mut K) {
    controller.scan();
    let down = controller.keys_down();
    let up = controller.keys_up();
    if down != 0 || up != 0 {
        dispatch(down, up, sink);
    }
}
