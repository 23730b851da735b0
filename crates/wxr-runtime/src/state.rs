//! Session lifecycle state machine.
//!
//! Every transition updates the authoritative state first and then appends exactly one
//! event per state entered, so pollers observe states in the order they were entered.

use tracing::debug;

use crate::event::{Event, EventQueue};
use crate::handle::SessionHandle;

/// Session states. Discriminants are the raw `XrSessionState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SessionState {
    Unknown = 0,
    Idle = 1,
    Ready = 2,
    Synchronized = 3,
    Visible = 4,
    Focused = 5,
    Stopping = 6,
    LossPending = 7,
    Exiting = 8,
}

impl SessionState {
    pub fn raw(self) -> i32 {
        self as i32
    }
}

#[derive(Debug)]
pub struct SessionStateMachine {
    session: SessionHandle,
    current: SessionState,
}

impl SessionStateMachine {
    /// A freshly created session sits in `IDLE` and immediately reports `READY`.
    pub fn created(session: SessionHandle, events: &mut EventQueue, time: i64) -> Self {
        let mut machine = Self {
            session,
            current: SessionState::Idle,
        };
        machine.enter(SessionState::Ready, events, time);
        machine
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn begin(&mut self, surface_focused: bool, events: &mut EventQueue, time: i64) {
        self.enter(SessionState::Synchronized, events, time);
        self.enter(SessionState::Visible, events, time);
        if surface_focused {
            self.enter(SessionState::Focused, events, time);
        }
    }

    pub fn end(&mut self, events: &mut EventQueue, time: i64) {
        self.enter(SessionState::Stopping, events, time);
        self.enter(SessionState::Idle, events, time);
    }

    pub fn request_exit(&mut self, events: &mut EventQueue, time: i64) {
        self.enter(SessionState::Exiting, events, time);
    }

    /// Preview surface focus change. Only `VISIBLE <-> FOCUSED` reacts to focus.
    pub fn focus_changed(&mut self, focused: bool, events: &mut EventQueue, time: i64) {
        match (self.current, focused) {
            (SessionState::Visible, true) => self.enter(SessionState::Focused, events, time),
            (SessionState::Focused, false) => self.enter(SessionState::Visible, events, time),
            _ => {}
        }
    }

    /// Silent reset used on destroy. No event is emitted.
    pub fn reset(&mut self) {
        self.current = SessionState::Idle;
    }

    fn enter(&mut self, state: SessionState, events: &mut EventQueue, time: i64) {
        debug!(session = %self.session, from = ?self.current, to = ?state, "session state");
        self.current = state;
        events.push(Event::SessionStateChanged {
            session: self.session,
            state,
            time,
        });
    }
}
