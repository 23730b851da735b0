//! Reference and action spaces.

use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec3;
use tracing::debug;

use crate::error::{XrError, XrResult};
use crate::handle::{ActionHandle, HandleAllocator, SpaceHandle};
use crate::input::PathTable;
use crate::pose::PoseSnapshot;
use crate::tracking::{controller_state, Hand, Pose, VelocityTracker};

/// Stage extent reported by `xrGetReferenceSpaceBoundsRect`, in meters.
pub const STAGE_BOUNDS: (f32, f32) = (3.0, 3.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
}

impl ReferenceSpaceType {
    pub const ALL: [Self; 3] = [Self::View, Self::Local, Self::Stage];

    pub fn from_raw(raw: i32) -> XrResult<Self> {
        match raw {
            1 => Ok(Self::View),
            2 => Ok(Self::Local),
            3 => Ok(Self::Stage),
            other => Err(XrError::ReferenceSpaceUnsupported(other)),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::View => 1,
            Self::Local => 2,
            Self::Stage => 3,
        }
    }
}

bitflags! {
    /// Raw `XrSpaceLocationFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LocationFlags: u64 {
        const ORIENTATION_VALID = 0x1;
        const POSITION_VALID = 0x2;
        const ORIENTATION_TRACKED = 0x4;
        const POSITION_TRACKED = 0x8;
    }
}

impl LocationFlags {
    pub const VALID: Self = Self::ORIENTATION_VALID.union(Self::POSITION_VALID);
    pub const TRACKED: Self = Self::VALID
        .union(Self::ORIENTATION_TRACKED)
        .union(Self::POSITION_TRACKED);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceKind {
    Reference(ReferenceSpaceType),
    Action {
        action: ActionHandle,
        controller: Option<Hand>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceLocation {
    pub flags: LocationFlags,
    pub pose: Pose,
    /// Present only for controller spaces.
    pub linear_velocity: Option<Vec3>,
}

pub struct SpaceRegistry {
    spaces: HashMap<SpaceHandle, SpaceKind>,
    reference_handles: HandleAllocator,
    action_handles: HandleAllocator,
}

impl Default for SpaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaceRegistry {
    pub fn new() -> Self {
        Self {
            spaces: HashMap::new(),
            reference_handles: HandleAllocator::starting_at(100),
            action_handles: HandleAllocator::starting_at(200),
        }
    }

    pub fn create_reference(&mut self, kind: ReferenceSpaceType) -> SpaceHandle {
        let handle = SpaceHandle::from_raw(self.reference_handles.next_raw());
        debug!(space = %handle, ?kind, "reference space created");
        self.spaces.insert(handle, SpaceKind::Reference(kind));
        handle
    }

    /// A subaction path naming `/user/hand/left` or `/user/hand/right` makes this a
    /// controller space.
    pub fn create_action_space(
        &mut self,
        action: ActionHandle,
        subaction_path: u64,
        paths: &PathTable,
    ) -> SpaceHandle {
        let handle = SpaceHandle::from_raw(self.action_handles.next_raw());
        let controller = paths.user_hand(subaction_path);
        debug!(space = %handle, action = %action, ?controller, "action space created");
        self.spaces
            .insert(handle, SpaceKind::Action { action, controller });
        handle
    }

    pub fn get(&self, space: SpaceHandle) -> XrResult<SpaceKind> {
        self.spaces
            .get(&space)
            .copied()
            .ok_or_else(|| XrError::handle(format!("space {space}")))
    }

    pub fn destroy(&mut self, space: SpaceHandle) -> XrResult<()> {
        self.spaces
            .remove(&space)
            .map(|_| ())
            .ok_or_else(|| XrError::handle(format!("space {space}")))
    }

    pub fn clear(&mut self) {
        self.spaces.clear();
    }

    /// Controller spaces report the hand pose; everything else is the identity.
    pub fn locate(
        &self,
        space: SpaceHandle,
        snapshot: &PoseSnapshot,
        velocity: &VelocityTracker,
    ) -> XrResult<SpaceLocation> {
        match self.get(space)? {
            SpaceKind::Action {
                controller: Some(hand),
                ..
            } => Ok(SpaceLocation {
                flags: LocationFlags::TRACKED,
                pose: controller_state(snapshot, hand).pose,
                linear_velocity: Some(velocity.linear(hand)),
            }),
            _ => Ok(SpaceLocation {
                flags: LocationFlags::VALID,
                pose: Pose::IDENTITY,
                linear_velocity: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ActionHandle;

    #[test]
    fn test_handle_bases() {
        let mut spaces = SpaceRegistry::new();
        let paths = PathTable::new();
        assert_eq!(spaces.create_reference(ReferenceSpaceType::Local).into_raw(), 100);
        assert_eq!(
            spaces
                .create_action_space(ActionHandle::from_raw(400), 0, &paths)
                .into_raw(),
            200
        );
    }

    #[test]
    fn test_unsupported_reference_type() {
        assert!(matches!(
            ReferenceSpaceType::from_raw(1000426000),
            Err(XrError::ReferenceSpaceUnsupported(_))
        ));
    }

    #[test]
    fn test_controller_space_locates_hand() {
        let mut paths = PathTable::new();
        let left = paths.intern("/user/hand/left").unwrap();
        let mut spaces = SpaceRegistry::new();
        let grip = spaces.create_action_space(ActionHandle::from_raw(400), left, &paths);
        let stage = spaces.create_reference(ReferenceSpaceType::Stage);

        let mut snap = PoseSnapshot::identity();
        snap.left.position = Vec3::new(-0.2, 1.1, -0.3);
        let tracker = VelocityTracker::default();

        let located = spaces.locate(grip, &snap, &tracker).unwrap();
        assert_eq!(located.flags, LocationFlags::TRACKED);
        assert_eq!(located.pose.position, Vec3::new(-0.2, 1.1, -0.3));
        assert_eq!(located.linear_velocity, Some(Vec3::ZERO));

        let located = spaces.locate(stage, &snap, &tracker).unwrap();
        assert_eq!(located.flags, LocationFlags::VALID);
        assert_eq!(located.pose, Pose::IDENTITY);
        assert!(located.linear_velocity.is_none());
    }

    #[test]
    fn test_destroy_invalidates() {
        let mut spaces = SpaceRegistry::new();
        let view = spaces.create_reference(ReferenceSpaceType::View);
        spaces.destroy(view).unwrap();
        assert!(spaces.destroy(view).is_err());
    }
}
