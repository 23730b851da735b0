//! Paths, action sets and actions.
//!
//! There is no binding resolution. An action's state comes from matching its name against
//! well-known words ("trigger", "grip", "thumbstick" ...) and reading the corresponding
//! control of the hand it resolves to.

use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec2;
use tracing::{debug, info};

use crate::error::{XrError, XrResult};
use crate::handle::{ActionHandle, ActionSetHandle, HandleAllocator};
use crate::pose::PoseSnapshot;
use crate::tracking::{controller_state, ControllerState, Hand};

pub const NULL_PATH: u64 = 0;
pub const UNKNOWN_SOURCE_NAME: &str = "Unknown";

/// djb2 over the UTF-8 bytes, wrapping at 64 bits.
pub fn djb2(text: &str) -> u64 {
    text.bytes().fold(5381u64, |hash, b| {
        hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(b as u64)
    })
}

/// Interned path strings.
#[derive(Debug, Default)]
pub struct PathTable {
    strings: HashMap<u64, String>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> XrResult<u64> {
        if text.is_empty() {
            return Err(XrError::validation("empty path string"));
        }
        let path = djb2(text);
        debug!(path, text, "path interned");
        self.strings.insert(path, text.to_string());
        Ok(path)
    }

    pub fn lookup(&self, path: u64) -> XrResult<&str> {
        self.strings
            .get(&path)
            .map(String::as_str)
            .ok_or(XrError::PathInvalid(path))
    }

    /// Hand named by a path containing `left` or `right`.
    pub fn hand_hint(&self, path: u64) -> Option<Hand> {
        let text = self.strings.get(&path)?;
        if text.contains("left") {
            Some(Hand::Left)
        } else if text.contains("right") {
            Some(Hand::Right)
        } else {
            None
        }
    }

    /// Hand of a top-level user path (`/user/hand/left` or `/user/hand/right`).
    pub fn user_hand(&self, path: u64) -> Option<Hand> {
        let text = self.strings.get(&path)?;
        if text.contains("/user/hand/left") {
            Some(Hand::Left)
        } else if text.contains("/user/hand/right") {
            Some(Hand::Right)
        } else {
            None
        }
    }
}

bitflags! {
    /// Hands named in an action's subaction paths.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HandBinding: u8 {
        const LEFT = 0b01;
        const RIGHT = 0b10;
    }
}

impl HandBinding {
    /// The single bound hand, if exactly one is bound.
    fn single(self) -> Option<Hand> {
        if self == Self::LEFT {
            Some(Hand::Left)
        } else if self == Self::RIGHT {
            Some(Hand::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Boolean,
    Float,
    Vector2f,
    Pose,
    VibrationOutput,
}

impl ActionType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            1 => Self::Boolean,
            2 => Self::Float,
            3 => Self::Vector2f,
            4 => Self::Pose,
            100 => Self::VibrationOutput,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ActionSet {
    pub name: String,
    pub priority: u32,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub set: ActionSetHandle,
    pub name: String,
    pub action_type: ActionType,
    pub hands: HandBinding,
}

/// Result of an action state query. Nothing ever reports a change between syncs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionState<T> {
    pub current: T,
    pub changed_since_last_sync: bool,
    pub last_change_time: i64,
    pub is_active: bool,
}

impl<T> ActionState<T> {
    fn active(current: T) -> Self {
        Self {
            current,
            changed_since_last_sync: false,
            last_change_time: 0,
            is_active: true,
        }
    }
}

fn name_has(name: &str, words: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    words.iter().any(|w| lower.contains(w))
}

const TRIGGER_WORDS: &[&str] = &["trigger", "select", "fire"];
const GRIP_WORDS: &[&str] = &["grip", "squeeze", "grab"];
const MENU_WORDS: &[&str] = &["menu"];
const PRIMARY_WORDS: &[&str] = &["primary", "a_button", "x_button"];
const SECONDARY_WORDS: &[&str] = &["secondary", "b_button", "y_button"];
const STICK_WORDS: &[&str] = &["thumbstick", "joystick"];
const AXIS_WORDS: &[&str] = &["thumbstick", "joystick", "move", "turn"];

fn boolean_for(name: &str, c: &ControllerState) -> bool {
    if name_has(name, TRIGGER_WORDS) {
        c.trigger > 0.5
    } else if name_has(name, GRIP_WORDS) {
        c.grip > 0.5
    } else if name_has(name, MENU_WORDS) {
        c.menu
    } else if name_has(name, PRIMARY_WORDS) {
        c.primary
    } else if name_has(name, SECONDARY_WORDS) {
        c.secondary
    } else if name_has(name, STICK_WORDS) {
        c.thumbstick_click
    } else {
        false
    }
}

fn float_for(name: &str, c: &ControllerState) -> f32 {
    if name_has(name, TRIGGER_WORDS) {
        c.trigger
    } else if name_has(name, GRIP_WORDS) {
        c.grip
    } else {
        0.0
    }
}

fn vector_for(name: &str, c: &ControllerState) -> Vec2 {
    if name_has(name, AXIS_WORDS) {
        c.thumbstick
    } else {
        Vec2::ZERO
    }
}

pub struct ActionRegistry {
    sets: HashMap<ActionSetHandle, ActionSet>,
    actions: HashMap<ActionHandle, Action>,
    set_handles: HandleAllocator,
    action_handles: HandleAllocator,
    attached: usize,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
            actions: HashMap::new(),
            set_handles: HandleAllocator::starting_at(300),
            action_handles: HandleAllocator::starting_at(400),
            attached: 0,
        }
    }

    pub fn create_set(&mut self, name: &str, priority: u32) -> XrResult<ActionSetHandle> {
        if name.is_empty() {
            return Err(XrError::validation("action set name is empty"));
        }
        let handle = ActionSetHandle::from_raw(self.set_handles.next_raw());
        info!(set = %handle, name, priority, "action set created");
        self.sets.insert(
            handle,
            ActionSet {
                name: name.to_string(),
                priority,
            },
        );
        Ok(handle)
    }

    /// Destroying a set destroys its actions.
    pub fn destroy_set(&mut self, set: ActionSetHandle) -> XrResult<()> {
        self.sets
            .remove(&set)
            .ok_or_else(|| XrError::handle(format!("action set {set}")))?;
        self.actions.retain(|_, action| action.set != set);
        Ok(())
    }

    pub fn set(&self, set: ActionSetHandle) -> XrResult<&ActionSet> {
        self.sets
            .get(&set)
            .ok_or_else(|| XrError::handle(format!("action set {set}")))
    }

    pub fn create_action(
        &mut self,
        set: ActionSetHandle,
        name: &str,
        action_type: ActionType,
        subaction_paths: &[u64],
        paths: &PathTable,
    ) -> XrResult<ActionHandle> {
        self.set(set)?;
        if name.is_empty() {
            return Err(XrError::validation("action name is empty"));
        }
        let mut hands = HandBinding::empty();
        for path in subaction_paths {
            if let Ok(text) = paths.lookup(*path) {
                if text.contains("left") {
                    hands |= HandBinding::LEFT;
                }
                if text.contains("right") {
                    hands |= HandBinding::RIGHT;
                }
            }
        }
        let handle = ActionHandle::from_raw(self.action_handles.next_raw());
        info!(action = %handle, name, ?action_type, ?hands, "action created");
        self.actions.insert(
            handle,
            Action {
                set,
                name: name.to_string(),
                action_type,
                hands,
            },
        );
        Ok(handle)
    }

    pub fn destroy_action(&mut self, action: ActionHandle) -> XrResult<()> {
        self.actions
            .remove(&action)
            .map(|_| ())
            .ok_or_else(|| XrError::handle(format!("action {action}")))
    }

    pub fn action(&self, action: ActionHandle) -> XrResult<&Action> {
        self.actions
            .get(&action)
            .ok_or_else(|| XrError::handle(format!("action {action}")))
    }

    pub fn attach(&mut self, sets: &[ActionSetHandle]) -> XrResult<()> {
        for set in sets {
            self.set(*set)?;
        }
        self.attached = sets.len();
        info!(count = sets.len(), "action sets attached");
        Ok(())
    }

    pub fn attached_count(&self) -> usize {
        self.attached
    }

    /// Subaction path first, then the action's own single-hand binding, then the right hand.
    pub fn resolve_hand(
        &self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
    ) -> XrResult<Hand> {
        let bound = self.action(action)?.hands;
        if subaction_path != NULL_PATH {
            if let Some(hand) = paths.hand_hint(subaction_path) {
                return Ok(hand);
            }
        }
        Ok(bound.single().unwrap_or(Hand::Right))
    }

    fn query(
        &self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
        snapshot: &PoseSnapshot,
    ) -> XrResult<(&str, ControllerState)> {
        let hand = self.resolve_hand(action, subaction_path, paths)?;
        let name = self.action(action)?.name.as_str();
        Ok((name, controller_state(snapshot, hand)))
    }

    pub fn boolean_state(
        &self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
        snapshot: &PoseSnapshot,
    ) -> XrResult<ActionState<bool>> {
        let (name, controller) = self.query(action, subaction_path, paths, snapshot)?;
        Ok(ActionState::active(boolean_for(name, &controller)))
    }

    pub fn float_state(
        &self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
        snapshot: &PoseSnapshot,
    ) -> XrResult<ActionState<f32>> {
        let (name, controller) = self.query(action, subaction_path, paths, snapshot)?;
        Ok(ActionState::active(float_for(name, &controller)))
    }

    pub fn vector2_state(
        &self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
        snapshot: &PoseSnapshot,
    ) -> XrResult<ActionState<Vec2>> {
        let (name, controller) = self.query(action, subaction_path, paths, snapshot)?;
        Ok(ActionState::active(vector_for(name, &controller)))
    }

    /// Pose actions are always active; their data comes from action spaces.
    pub fn pose_active(&self, action: ActionHandle) -> XrResult<bool> {
        self.action(action).map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Button;

    fn setup() -> (PathTable, ActionRegistry, ActionSetHandle) {
        let mut paths = PathTable::new();
        paths.intern("/user/hand/left").unwrap();
        paths.intern("/user/hand/right").unwrap();
        let mut actions = ActionRegistry::new();
        let set = actions.create_set("gameplay", 0).unwrap();
        (paths, actions, set)
    }

    #[test]
    fn test_djb2_matches_reference() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 5381 * 33 + 97);
    }

    #[test]
    fn test_path_round_trip_and_unknown() {
        let mut paths = PathTable::new();
        let p = paths.intern("/user/hand/left/input/trigger").unwrap();
        assert_eq!(paths.lookup(p).unwrap(), "/user/hand/left/input/trigger");
        assert!(matches!(paths.lookup(12345), Err(XrError::PathInvalid(12345))));
        assert!(paths.intern("").is_err());
    }

    #[test]
    fn test_handles_start_at_fixed_bases() {
        let (paths, mut actions, set) = setup();
        assert_eq!(set.into_raw(), 300);
        let action = actions
            .create_action(set, "fire", ActionType::Boolean, &[], &paths)
            .unwrap();
        assert_eq!(action.into_raw(), 400);
    }

    #[test]
    fn test_name_matching_reads_controller() {
        let (paths, mut actions, set) = setup();
        let left = djb2("/user/hand/left");
        let right = djb2("/user/hand/right");
        let grab = actions
            .create_action(set, "Grab_Object", ActionType::Boolean, &[left, right], &paths)
            .unwrap();
        let mut snap = PoseSnapshot::identity();
        snap.set_pressed(Button::LGrip, true);

        let state = actions.boolean_state(grab, left, &paths, &snap).unwrap();
        assert!(state.current);
        assert!(state.is_active);
        assert!(!state.changed_since_last_sync);
        // Both hands bound and no subaction path: defaults to the right hand.
        assert!(!actions.boolean_state(grab, NULL_PATH, &paths, &snap).unwrap().current);
    }

    #[test]
    fn test_single_hand_binding_wins_over_default() {
        let (paths, mut actions, set) = setup();
        let left = djb2("/user/hand/left");
        let menu = actions
            .create_action(set, "open_menu", ActionType::Boolean, &[left], &paths)
            .unwrap();
        assert_eq!(
            actions.resolve_hand(menu, NULL_PATH, &paths).unwrap(),
            Hand::Left
        );
    }

    #[test]
    fn test_float_and_vector_states() {
        let (paths, mut actions, set) = setup();
        let trigger = actions
            .create_action(set, "trigger_value", ActionType::Float, &[], &paths)
            .unwrap();
        let walk = actions
            .create_action(set, "Move", ActionType::Vector2f, &[], &paths)
            .unwrap();
        let jump = actions
            .create_action(set, "jump", ActionType::Float, &[], &paths)
            .unwrap();
        let mut snap = PoseSnapshot::identity();
        snap.set_pressed(Button::RTrigger, true);
        snap.right.thumbstick = Vec2::new(0.0, 1.0);
        assert_eq!(
            actions.float_state(trigger, NULL_PATH, &paths, &snap).unwrap().current,
            1.0
        );
        assert_eq!(
            actions.float_state(jump, NULL_PATH, &paths, &snap).unwrap().current,
            0.0
        );
        assert_eq!(
            actions.vector2_state(walk, NULL_PATH, &paths, &snap).unwrap().current,
            Vec2::new(0.0, 1.0)
        );
    }

    #[test]
    fn test_destroy_set_removes_actions() {
        let (paths, mut actions, set) = setup();
        let a = actions
            .create_action(set, "fire", ActionType::Boolean, &[], &paths)
            .unwrap();
        actions.destroy_set(set).unwrap();
        assert!(matches!(actions.action(a), Err(XrError::HandleInvalid(_))));
        assert!(actions.destroy_set(set).is_err());
    }
}
