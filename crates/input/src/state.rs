//! Logical input state fed by terminal key events.
//!
//! Presses latch a per-action flag that the game step reads and clears with
//! [`InputState::consume`]. Terminals that never report key releases still work:
//! consuming clears the flag either way.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::bindings::KeyBindings;
use crate::types::GameAction;

#[derive(Debug, Clone)]
pub struct InputState {
    bindings: KeyBindings,
    pressed: [bool; GameAction::ALL.len()],
    attached: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::with_bindings(KeyBindings::default())
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            pressed: [false; GameAction::ALL.len()],
            attached: false,
        }
    }

    /// Start accepting key events
    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stop accepting key events and drop anything still latched
    pub fn detach(&mut self) {
        self.attached = false;
        self.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    /// Feed a terminal key event. Returns true if it matched any binding.
    pub fn handle_key_event(&mut self, event: KeyEvent) -> bool {
        match event.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => self.key_down(event.code),
            KeyEventKind::Release => self.key_up(event.code),
        }
    }

    pub fn key_down(&mut self, code: KeyCode) -> bool {
        if !self.attached {
            return false;
        }
        let mut matched = false;
        for action in self.bindings.actions_for(code) {
            self.pressed[action.index()] = true;
            matched = true;
        }
        matched
    }

    pub fn key_up(&mut self, code: KeyCode) -> bool {
        if !self.attached {
            return false;
        }
        let mut matched = false;
        for action in self.bindings.actions_for(code) {
            self.pressed[action.index()] = false;
            matched = true;
        }
        matched
    }

    /// Latch an action directly (buttons, scripted input).
    ///
    /// Attachment only gates terminal key events; direct presses latch
    /// whether or not the state is attached.
    pub fn press(&mut self, action: GameAction) {
        self.pressed[action.index()] = true;
    }

    pub fn release(&mut self, action: GameAction) {
        self.pressed[action.index()] = false;
    }

    pub fn is_pressed(&self, action: GameAction) -> bool {
        self.pressed[action.index()]
    }

    /// Read and clear the flag for `action`
    pub fn consume(&mut self, action: GameAction) -> bool {
        std::mem::replace(&mut self.pressed[action.index()], false)
    }

    pub fn clear(&mut self) {
        self.pressed = [false; GameAction::ALL.len()];
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
