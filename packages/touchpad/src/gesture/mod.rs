use statig::blocking::IntoStateMachineExt as _;

use crate::protocol::{TouchFrame, TouchPoint};

mod hsm;

use hsm::GestureHsm;

// Windows are exclusive on both ends and measured from the last confirmed press.
pub const TAP_MIN_MS: u32 = 20;
pub const TAP_MAX_MS: u32 = 200;
pub const DOUBLE_CLICK_MIN_GAP_MS: u32 = 100;
pub const DOUBLE_CLICK_MAX_GAP_MS: u32 = 500;
pub const ELAPSED_CEILING_MS: u32 = 5_000;
pub const DEBOUNCE_TICKS: u8 = 2;
/// Nominal tick cadence the windows above were tuned for.
pub const TICK_INTERVAL_MS: u32 = 10;

pub const BUTTON_LEFT: u8 = 0x01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerUpdate {
    pub delta_x: i8,
    pub delta_y: i8,
    pub left_button: bool,
    pub changed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Init,
    Release,
    Tracking,
    TrackingReleasePulse,
    DoubleClickHeld,
    Idle,
}

impl GesturePhase {
    pub fn label(self) -> &'static str {
        match self {
            GesturePhase::Init => "init",
            GesturePhase::Release => "release",
            GesturePhase::Tracking => "tracking",
            GesturePhase::TrackingReleasePulse => "release_pulse",
            GesturePhase::DoubleClickHeld => "double_click_held",
            GesturePhase::Idle => "idle",
        }
    }
}

/// Snapshot of the classifier memory carried between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureState {
    pub phase: GesturePhase,
    pub press_counter: u8,
    pub release_counter: u8,
    pub elapsed_since_transition: u32,
    pub last_x: u16,
    pub last_y: u16,
    pub buttons: u8,
}

#[derive(Clone, Copy, Debug)]
enum GestureHsmEvent {
    Tick {
        elapsed_ms: u32,
        primary: Option<TouchPoint>,
    },
}

#[derive(Clone, Copy, Debug, Default)]
struct DispatchContext {
    delta_x: i8,
    delta_y: i8,
    changed: bool,
}

impl DispatchContext {
    fn finish(self, buttons: u8) -> PointerUpdate {
        PointerUpdate {
            delta_x: self.delta_x,
            delta_y: self.delta_y,
            left_button: buttons & BUTTON_LEFT != 0,
            changed: self.changed,
        }
    }
}

/// Turns one touch frame per tick into relative pointer motion and left-button
/// clicks. Not reentrant: callers driving it from an interrupt must serialize
/// ticks themselves.
pub struct GestureClassifier {
    machine: statig::blocking::StateMachine<GestureHsm>,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self {
            machine: GestureHsm::new().state_machine(),
        }
    }

    pub fn tick(&mut self, frame: &TouchFrame, elapsed_ms: u32) -> PointerUpdate {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(
            &GestureHsmEvent::Tick {
                elapsed_ms,
                primary: frame.primary(),
            },
            &mut context,
        );
        context.finish(self.machine.inner().buttons)
    }

    pub fn state(&self) -> GestureState {
        let inner = self.machine.inner();
        GestureState {
            phase: inner.phase,
            press_counter: inner.press_counter,
            release_counter: inner.release_counter,
            elapsed_since_transition: inner.elapsed_since_transition,
            last_x: inner.last_x,
            last_y: inner.last_y,
            buttons: inner.buttons,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.machine.inner().phase
    }
}

pub(crate) fn is_tap_duration(elapsed_ms: u32) -> bool {
    TAP_MIN_MS < elapsed_ms && elapsed_ms < TAP_MAX_MS
}

pub(crate) fn is_double_click_gap(elapsed_ms: u32) -> bool {
    DOUBLE_CLICK_MIN_GAP_MS < elapsed_ms && elapsed_ms < DOUBLE_CLICK_MAX_GAP_MS
}

/// Signed step between two sensor coordinates, saturated to the report range.
pub(crate) fn axis_delta(current: u16, last: u16) -> i8 {
    (current as i32 - last as i32).clamp(i8::MIN as i32, i8::MAX as i32) as i8
}
