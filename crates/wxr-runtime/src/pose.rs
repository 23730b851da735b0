//! Tracking packet format.
//!
//! One datagram is one whitespace-separated text record:
//!
//! ```text
//! <client> <28 floats> <frame id> [<button string>]
//! ```
//!
//! The button string holds one `T`/`F` per [`Button`] in declaration order. A missing
//! string means nothing is pressed.

use std::fmt::Write as _;
use std::str::FromStr;

use glam::{Quat, Vec2, Vec3};
use wxr_common::{Error, Result};

pub const FLOAT_COUNT: usize = 28;
pub const BUTTON_COUNT: usize = 19;

/// Button slots in packet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Button {
    LGrip = 0,
    LMenu,
    LThumbstickPress,
    LThumbLeft,
    LThumbRight,
    LThumbUp,
    LThumbDown,
    LTrigger,
    LX,
    LY,
    RA,
    RB,
    RGrip,
    RThumbstickPress,
    RThumbLeft,
    RThumbRight,
    RThumbUp,
    RThumbDown,
    RTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub orientation: Quat,
    pub position: Vec3,
    pub thumbstick: Vec2,
}

impl Default for HandPose {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position: Vec3::ZERO,
            thumbstick: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseSnapshot {
    pub client: String,
    pub left: HandPose,
    pub right: HandPose,
    pub head_orientation: Quat,
    pub head_position: Vec3,
    pub ipd: f32,
    pub fov_horizontal: f32,
    pub fov_vertical: f32,
    pub frame_id: i64,
    pub buttons: [bool; BUTTON_COUNT],
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self::identity()
    }
}

fn quat(f: &[f32]) -> Quat {
    let q = Quat::from_xyzw(f[0], f[1], f[2], f[3]);
    if q.length_squared() > 0.0 {
        q
    } else {
        Quat::IDENTITY
    }
}

impl PoseSnapshot {
    /// Pose used before any packet arrives or when waiting times out.
    pub fn identity() -> Self {
        Self {
            client: String::new(),
            left: HandPose::default(),
            right: HandPose::default(),
            head_orientation: Quat::IDENTITY,
            head_position: Vec3::ZERO,
            ipd: 0.064,
            fov_horizontal: 0.0,
            fov_vertical: 0.0,
            frame_id: 0,
            buttons: [false; BUTTON_COUNT],
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let client = tokens
            .next()
            .ok_or_else(|| Error::protocol("empty pose record"))?
            .to_string();

        let mut f = [0f32; FLOAT_COUNT];
        for (i, slot) in f.iter_mut().enumerate() {
            let token = tokens
                .next()
                .ok_or_else(|| Error::protocol(format!("pose record has {i} of {FLOAT_COUNT} floats")))?;
            *slot = token
                .parse()
                .map_err(|_| Error::protocol(format!("float {i} is not a number: {token:?}")))?;
        }

        let frame_token = tokens
            .next()
            .ok_or_else(|| Error::protocol("pose record has no frame id"))?;
        let frame_id = frame_token
            .parse::<i64>()
            .or_else(|_| frame_token.parse::<f64>().map(|v| v as i64))
            .map_err(|_| Error::protocol(format!("frame id is not a number: {frame_token:?}")))?;

        let mut buttons = [false; BUTTON_COUNT];
        if let Some(flags) = tokens.next() {
            let pressed = flags.chars().filter_map(|c| match c {
                'T' => Some(true),
                'F' => Some(false),
                _ => None,
            });
            for (slot, value) in buttons.iter_mut().zip(pressed) {
                *slot = value;
            }
        }

        Ok(Self {
            client,
            left: HandPose {
                orientation: quat(&f[0..4]),
                thumbstick: Vec2::new(f[4], f[5]),
                position: Vec3::new(f[6], f[7], f[8]),
            },
            right: HandPose {
                orientation: quat(&f[9..13]),
                thumbstick: Vec2::new(f[13], f[14]),
                position: Vec3::new(f[15], f[16], f[17]),
            },
            head_orientation: quat(&f[18..22]),
            head_position: Vec3::new(f[22], f[23], f[24]),
            ipd: f[25],
            fov_horizontal: f[26],
            fov_vertical: f[27],
            frame_id,
            buttons,
        })
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.buttons[button as usize]
    }

    pub fn set_pressed(&mut self, button: Button, pressed: bool) {
        self.buttons[button as usize] = pressed;
    }

    /// Encode back into the wire format.
    pub fn to_record(&self) -> String {
        let client = if self.client.is_empty() {
            "client0"
        } else {
            self.client.as_str()
        };
        let mut out = String::from(client);
        let floats: Vec<f32> = [
            self.left.orientation.to_array().as_slice(),
            self.left.thumbstick.to_array().as_slice(),
            self.left.position.to_array().as_slice(),
            self.right.orientation.to_array().as_slice(),
            self.right.thumbstick.to_array().as_slice(),
            self.right.position.to_array().as_slice(),
            self.head_orientation.to_array().as_slice(),
            self.head_position.to_array().as_slice(),
            [self.ipd, self.fov_horizontal, self.fov_vertical].as_slice(),
        ]
        .concat();
        for value in floats {
            let _ = write!(out, " {value}");
        }
        let _ = write!(out, " {} ", self.frame_id);
        out.extend(self.buttons.iter().map(|b| if *b { 'T' } else { 'F' }));
        out
    }
}

impl FromStr for PoseSnapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
