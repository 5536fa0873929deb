//! Key bindings from terminal key codes to game actions.

use arrayvec::ArrayVec;
use crossterm::event::KeyCode;

use crate::types::GameAction;

/// Most keys any one action may be bound to
pub const MAX_KEYS_PER_ACTION: usize = 4;

pub type KeyList = ArrayVec<KeyCode, MAX_KEYS_PER_ACTION>;

/// Rebindable mapping, one key list per [`GameAction`].
///
/// A key may appear under more than one action; pressing it triggers all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    keys: [KeyList; GameAction::ALL.len()],
}

impl KeyBindings {
    /// Bindings with no keys at all
    pub fn empty() -> Self {
        Self {
            keys: std::array::from_fn(|_| KeyList::new()),
        }
    }

    /// Replace the keys bound to `action`. Keys beyond
    /// [`MAX_KEYS_PER_ACTION`] are ignored.
    pub fn bind(&mut self, action: GameAction, keys: &[KeyCode]) -> &mut Self {
        let list = &mut self.keys[action.index()];
        list.clear();
        list.extend(keys.iter().copied().take(MAX_KEYS_PER_ACTION));
        self
    }

    pub fn keys_for(&self, action: GameAction) -> &[KeyCode] {
        &self.keys[action.index()]
    }

    /// Every action bound to `code`, in [`GameAction::ALL`] order
    pub fn actions_for(&self, code: KeyCode) -> impl Iterator<Item = GameAction> + '_ {
        GameAction::ALL
            .into_iter()
            .filter(move |action| self.keys[action.index()].contains(&code))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings
            .bind(GameAction::MoveLeft, &[KeyCode::Left])
            .bind(GameAction::MoveRight, &[KeyCode::Right])
            .bind(GameAction::SoftDrop, &[KeyCode::Down])
            .bind(GameAction::HardDrop, &[KeyCode::Char(' ')])
            .bind(
                GameAction::RotateCw,
                &[KeyCode::Char('x'), KeyCode::Char('X'), KeyCode::Up],
            )
            .bind(GameAction::RotateCcw, &[KeyCode::Char('z'), KeyCode::Char('Z')])
            .bind(GameAction::Hold, &[KeyCode::Char('c'), KeyCode::Char('C')])
            .bind(GameAction::Pause, &[KeyCode::Char('p'), KeyCode::Char('P')])
            .bind(GameAction::Restart, &[KeyCode::Char('r'), KeyCode::Char('R')]);
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(bindings: &KeyBindings, code: KeyCode) -> Option<GameAction> {
        bindings.actions_for(code).next()
    }

    #[test]
    fn test_default_movement_keys() {
        let b = KeyBindings::default();
        assert_eq!(first(&b, KeyCode::Left), Some(GameAction::MoveLeft));
        assert_eq!(first(&b, KeyCode::Right), Some(GameAction::MoveRight));
        assert_eq!(first(&b, KeyCode::Down), Some(GameAction::SoftDrop));
        assert_eq!(first(&b, KeyCode::Char(' ')), Some(GameAction::HardDrop));
    }

    #[test]
    fn test_default_rotation_and_actions() {
        let b = KeyBindings::default();
        assert_eq!(first(&b, KeyCode::Up), Some(GameAction::RotateCw));
        assert_eq!(first(&b, KeyCode::Char('X')), Some(GameAction::RotateCw));
        assert_eq!(first(&b, KeyCode::Char('z')), Some(GameAction::RotateCcw));
        assert_eq!(first(&b, KeyCode::Char('C')), Some(GameAction::Hold));
        assert_eq!(first(&b, KeyCode::Char('p')), Some(GameAction::Pause));
        assert_eq!(first(&b, KeyCode::Char('r')), Some(GameAction::Restart));
        assert_eq!(first(&b, KeyCode::Char('q')), None);
    }

    #[test]
    fn test_rebind_replaces_keys() {
        let mut b = KeyBindings::default();
        b.bind(GameAction::MoveLeft, &[KeyCode::Char('a')]);
        assert_eq!(first(&b, KeyCode::Left), None);
        assert_eq!(first(&b, KeyCode::Char('a')), Some(GameAction::MoveLeft));
        assert_eq!(b.keys_for(GameAction::MoveLeft), &[KeyCode::Char('a')]);
    }

    #[test]
    fn test_shared_key_triggers_every_action() {
        let mut b = KeyBindings::empty();
        b.bind(GameAction::HardDrop, &[KeyCode::Enter])
            .bind(GameAction::Hold, &[KeyCode::Enter]);
        let actions: Vec<_> = b.actions_for(KeyCode::Enter).collect();
        assert_eq!(actions, vec![GameAction::HardDrop, GameAction::Hold]);
    }
}
