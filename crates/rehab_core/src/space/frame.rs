//! Head-anchored reference frame and spawn orientation helpers.

use std::cell::Cell as StdCell;
use std::fmt;
use std::rc::Rc;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// World-space vector, metres.
pub type Vec3 = Vector3<f32>;

/// World up axis. Container placement and horizontal projection use it
/// instead of the head's own up vector so baskets stay level.
pub fn world_up() -> Vec3 {
    Vec3::new(0.0, 1.0, 0.0)
}

/// Patient head pose: origin plus an orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self::identity()
    }
}

impl ReferenceFrame {
    /// Origin, looking down +Z with +X to the right.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            forward: Vec3::new(0.0, 0.0, 1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: world_up(),
        }
    }

    pub fn new(position: Vec3, forward: Vec3, right: Vec3, up: Vec3) -> Self {
        Self { position, forward, right, up }
    }

    /// Level head at `position` turned `yaw_deg` degrees to the right.
    pub fn from_yaw(position: Vec3, yaw_deg: f32) -> Self {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_deg.to_radians());
        Self {
            position,
            forward: rotation * Vec3::new(0.0, 0.0, 1.0),
            right: rotation * Vec3::new(1.0, 0.0, 0.0),
            up: world_up(),
        }
    }

    /// Frame-local `(right, up, forward)` coordinates to a world-space offset.
    pub fn local_to_offset(&self, local: &Vec3) -> Vec3 {
        self.right * local.x + self.up * local.y + self.forward * local.z
    }

    /// Forward projected onto the horizontal plane, plus the matching right
    /// axis. Falls back to the raw axes when looking straight up or down.
    pub fn horizontal_basis(&self) -> (Vec3, Vec3) {
        let up = world_up();
        let flat = self.forward - up * self.forward.dot(&up);
        if flat.norm_squared() < 1e-6 {
            return (self.forward, self.right);
        }
        let forward = flat.normalize();
        let right = up.cross(&forward).normalize();
        (forward, right)
    }

    /// Rotation whose local +Z follows `forward` and +Y follows `up`.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::face_towards(&self.forward, &self.up)
    }
}

/// Which hand the session trains. The whole layout shifts toward that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandSide {
    #[default]
    Right,
    Left,
}

impl HandSide {
    pub fn sign(&self) -> f32 {
        match self {
            HandSide::Right => 1.0,
            HandSide::Left => -1.0,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            HandSide::Right => HandSide::Left,
            HandSide::Left => HandSide::Right,
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HandSide::Right => write!(f, "right"),
            HandSide::Left => write!(f, "left"),
        }
    }
}

/// Orientation given to a freshly spawned target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Keep the asset's authored rotation.
    PrefabRotation,
    /// Copy the head orientation.
    #[default]
    MatchFrame,
    /// Billboard toward the head position.
    FaceFrame,
}

pub fn spawn_rotation(mode: RotationMode, frame: &ReferenceFrame, at: &Vec3) -> UnitQuaternion<f32> {
    match mode {
        RotationMode::PrefabRotation => UnitQuaternion::identity(),
        RotationMode::MatchFrame => frame.rotation(),
        RotationMode::FaceFrame => {
            let mut dir = frame.position - at;
            if dir.norm_squared() < 1e-6 {
                dir = -frame.forward;
            }
            UnitQuaternion::face_towards(&dir.normalize(), &frame.up)
        }
    }
}

/// Head pose source, polled once per workspace (re)generation.
pub trait ReferenceFrameProvider {
    fn current_frame(&self) -> ReferenceFrame;
}

/// A frame that never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedFrame(pub ReferenceFrame);

impl ReferenceFrameProvider for FixedFrame {
    fn current_frame(&self) -> ReferenceFrame {
        self.0
    }
}

/// Head pose shared with the host's tracking loop. Clones observe the same
/// pose, so the host keeps one handle and updates it every frame.
#[derive(Debug, Clone, Default)]
pub struct TrackedFrame {
    pose: Rc<StdCell<ReferenceFrame>>,
}

impl TrackedFrame {
    pub fn new(frame: ReferenceFrame) -> Self {
        Self { pose: Rc::new(StdCell::new(frame)) }
    }

    pub fn set(&self, frame: ReferenceFrame) {
        self.pose.set(frame);
    }
}

impl ReferenceFrameProvider for TrackedFrame {
    fn current_frame(&self) -> ReferenceFrame {
        self.pose.get()
    }
}
