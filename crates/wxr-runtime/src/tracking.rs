//! Head, eye and controller state derived from pose snapshots.

use std::time::Duration;

use glam::{Quat, Vec2, Vec3};

use crate::pose::{Button, PoseSnapshot};

pub const DEFAULT_IPD: f32 = 0.064;
pub const VIEW_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Tangents of the half angles, in OpenXR order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Fov {
    pub fn symmetric(degrees: u32) -> Self {
        let t = (degrees as f32 * 0.5).to_radians().tan();
        Self {
            angle_left: -t,
            angle_right: t,
            angle_up: t,
            angle_down: -t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub pose: Pose,
    pub fov: Fov,
}

/// Eye poses: head orientation, with each eye offset by half the IPD along the head's
/// local X axis.
pub fn locate_views(snapshot: &PoseSnapshot, fov_degrees: u32) -> [View; VIEW_COUNT] {
    let orientation = snapshot.head_orientation;
    let fov = Fov::symmetric(fov_degrees);
    let eye = |sign: f32| View {
        pose: Pose {
            orientation,
            position: snapshot.head_position
                + orientation * Vec3::new(sign * DEFAULT_IPD * 0.5, 0.0, 0.0),
        },
        fov,
    };
    [eye(-1.0), eye(1.0)]
}

/// Input state of one controller for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    pub pose: Pose,
    pub trigger: f32,
    pub grip: f32,
    pub thumbstick: Vec2,
    pub thumbstick_click: bool,
    pub primary: bool,
    pub secondary: bool,
    pub menu: bool,
}

fn value(pressed: bool) -> f32 {
    if pressed {
        1.0
    } else {
        0.0
    }
}

pub fn controller_state(snapshot: &PoseSnapshot, hand: Hand) -> ControllerState {
    match hand {
        Hand::Left => ControllerState {
            pose: Pose {
                orientation: snapshot.left.orientation,
                position: snapshot.left.position,
            },
            trigger: value(snapshot.pressed(Button::LTrigger)),
            grip: value(snapshot.pressed(Button::LGrip)),
            thumbstick: snapshot.left.thumbstick,
            thumbstick_click: snapshot.pressed(Button::LThumbstickPress),
            primary: snapshot.pressed(Button::LX),
            secondary: snapshot.pressed(Button::LY),
            menu: snapshot.pressed(Button::LMenu),
        },
        Hand::Right => ControllerState {
            pose: Pose {
                orientation: snapshot.right.orientation,
                position: snapshot.right.position,
            },
            trigger: value(snapshot.pressed(Button::RTrigger)),
            grip: value(snapshot.pressed(Button::RGrip)),
            thumbstick: snapshot.right.thumbstick,
            thumbstick_click: snapshot.pressed(Button::RThumbstickPress),
            primary: snapshot.pressed(Button::RA),
            secondary: snapshot.pressed(Button::RB),
            menu: false,
        },
    }
}

/// Per-hand linear velocity from the position delta between consecutive frames.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    previous: Option<[Vec3; 2]>,
    velocity: [Vec3; 2],
}

impl VelocityTracker {
    pub fn update(&mut self, snapshot: &PoseSnapshot, period: Duration) {
        let current = [snapshot.left.position, snapshot.right.position];
        let dt = period.as_secs_f32();
        if let Some(previous) = self.previous {
            if dt > 0.0 {
                self.velocity = [
                    (current[0] - previous[0]) / dt,
                    (current[1] - previous[1]) / dt,
                ];
            }
        }
        self.previous = Some(current);
    }

    pub fn linear(&self, hand: Hand) -> Vec3 {
        match hand {
            Hand::Left => self.velocity[0],
            Hand::Right => self.velocity[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_views_identity_head() {
        let mut snap = PoseSnapshot::identity();
        snap.head_position = Vec3::new(0.0, 1.7, 0.0);
        let views = locate_views(&snap, 90);
        assert!(approx(views[0].pose.position, Vec3::new(-0.032, 1.7, 0.0)));
        assert!(approx(views[1].pose.position, Vec3::new(0.032, 1.7, 0.0)));
        assert!((views[0].fov.angle_right - 1.0).abs() < 1e-5);
        assert!((views[0].fov.angle_down + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_eye_offset_follows_head_yaw() {
        let mut snap = PoseSnapshot::identity();
        snap.head_orientation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let views = locate_views(&snap, 90);
        // Local +X maps to world -Z after a 90 degree yaw.
        assert!(approx(views[1].pose.position, Vec3::new(0.0, 0.0, -0.032)));
    }

    #[test]
    fn test_controller_buttons() {
        let mut snap = PoseSnapshot::identity();
        snap.set_pressed(Button::RTrigger, true);
        snap.set_pressed(Button::LMenu, true);
        snap.set_pressed(Button::LY, true);
        snap.right.thumbstick = Vec2::new(0.5, -0.25);
        let right = controller_state(&snap, Hand::Right);
        assert_eq!(right.trigger, 1.0);
        assert_eq!(right.grip, 0.0);
        assert_eq!(right.thumbstick, Vec2::new(0.5, -0.25));
        let left = controller_state(&snap, Hand::Left);
        assert!(left.menu);
        assert!(left.secondary);
        assert!(!left.primary);
    }

    #[test]
    fn test_velocity_from_delta() {
        let mut tracker = VelocityTracker::default();
        let mut snap = PoseSnapshot::identity();
        tracker.update(&snap, Duration::from_millis(10));
        assert_eq!(tracker.linear(Hand::Right), Vec3::ZERO);
        snap.right.position = Vec3::new(0.01, 0.0, 0.0);
        tracker.update(&snap, Duration::from_millis(10));
        assert!(approx(tracker.linear(Hand::Right), Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(tracker.linear(Hand::Left), Vec3::ZERO);
    }
}
