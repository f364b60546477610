use log::{debug, info};
use statig::prelude::*;

use super::*;

pub(super) struct GestureHsm {
    pub(super) phase: GesturePhase,
    pub(super) press_counter: u8,
    pub(super) release_counter: u8,
    pub(super) elapsed_since_transition: u32,
    pub(super) last_x: u16,
    pub(super) last_y: u16,
    pub(super) buttons: u8,
}

#[state_machine(initial = "State::init()")]
impl GestureHsm {
    #[state]
    fn init(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let _ = context;
        let _ = self.observe(event);
        self.reset_counters();
        self.enter(GesturePhase::Release);
        Transition(State::release())
    }

    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let _ = context;
        let _ = self.observe(event);
        self.reset_counters();
        self.enter(GesturePhase::Release);
        Transition(State::release())
    }

    #[state]
    fn release(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        let Some(point) = self.observe(event) else {
            self.press_counter = 0;
            return Handled;
        };

        self.press_counter = self.press_counter.saturating_add(1);
        if self.press_counter < DEBOUNCE_TICKS {
            return Handled;
        }

        let gap_ms = self.elapsed_since_transition;
        self.elapsed_since_transition = 0;
        self.last_x = point.x;
        self.last_y = point.y;

        if is_double_click_gap(gap_ms) {
            self.set_left_button(context, true);
            info!(
                "gesture: double_click gap_ms={} x={} y={}",
                gap_ms, point.x, point.y
            );
            self.enter(GesturePhase::DoubleClickHeld);
            Transition(State::double_click_held())
        } else {
            self.enter(GesturePhase::Tracking);
            Transition(State::tracking())
        }
    }

    #[state]
    fn tracking(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        if let Some(point) = self.observe(event) {
            self.release_counter = 0;
            self.follow(context, point);
            // Every tick with contact is reported, stationary or not.
            context.changed = true;
            return Handled;
        }

        self.release_counter = self.release_counter.saturating_add(1);
        if self.release_counter < DEBOUNCE_TICKS {
            return Handled;
        }

        let held_ms = self.elapsed_since_transition;
        if is_tap_duration(held_ms) {
            self.set_left_button(context, true);
            info!("gesture: click held_ms={}", held_ms);
            self.enter(GesturePhase::TrackingReleasePulse);
            Transition(State::tracking_release_pulse())
        } else {
            debug!("gesture: drag_end held_ms={}", held_ms);
            self.enter(GesturePhase::Idle);
            Transition(State::idle())
        }
    }

    // Releases the button pressed by a tap one tick after it went down.
    #[state]
    fn tracking_release_pulse(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        let _ = self.observe(event);
        self.set_left_button(context, false);
        self.enter(GesturePhase::Idle);
        Transition(State::idle())
    }

    #[state]
    fn double_click_held(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        if let Some(point) = self.observe(event) {
            self.release_counter = 0;
            self.follow(context, point);
            return Handled;
        }

        self.release_counter = self.release_counter.saturating_add(1);
        if self.release_counter < DEBOUNCE_TICKS {
            return Handled;
        }

        self.set_left_button(context, false);
        info!(
            "gesture: double_click_release held_ms={}",
            self.elapsed_since_transition
        );
        self.enter(GesturePhase::Idle);
        Transition(State::idle())
    }
}

impl GestureHsm {
    pub(super) fn new() -> Self {
        Self {
            phase: GesturePhase::Init,
            press_counter: 0,
            release_counter: 0,
            elapsed_since_transition: 0,
            last_x: 0,
            last_y: 0,
            buttons: 0,
        }
    }

    /// Advances the transition clock and returns the primary contact, if any.
    fn observe(&mut self, event: &GestureHsmEvent) -> Option<TouchPoint> {
        match event {
            GestureHsmEvent::Tick {
                elapsed_ms,
                primary,
            } => {
                self.elapsed_since_transition = self
                    .elapsed_since_transition
                    .saturating_add(*elapsed_ms)
                    .min(ELAPSED_CEILING_MS);
                *primary
            }
        }
    }

    fn reset_counters(&mut self) {
        self.press_counter = 0;
        self.release_counter = 0;
    }

    fn follow(&mut self, context: &mut DispatchContext, point: TouchPoint) {
        context.delta_x = axis_delta(point.x, self.last_x);
        context.delta_y = axis_delta(point.y, self.last_y);
        self.last_x = point.x;
        self.last_y = point.y;
        if context.delta_x != 0 || context.delta_y != 0 {
            context.changed = true;
        }
    }

    fn set_left_button(&mut self, context: &mut DispatchContext, pressed: bool) {
        if pressed {
            self.buttons |= BUTTON_LEFT;
        } else {
            self.buttons &= !BUTTON_LEFT;
        }
        context.changed = true;
    }

    fn enter(&mut self, phase: GesturePhase) {
        debug!(
            "gesture: transition from={} to={} elapsed_ms={}",
            self.phase.label(),
            phase.label(),
            self.elapsed_since_transition
        );
        self.phase = phase;
    }
}
