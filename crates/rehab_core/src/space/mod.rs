//! Spatial cell generation around the patient's head.
//!
//! - `frame`: reference frame, hand side, spawn orientation
//! - `layout`: line lattice and spherical arc parameters
//! - `workspace`: cell generation and logical index lookup

pub mod frame;
pub mod layout;
pub mod workspace;

pub use frame::{
    spawn_rotation, world_up, FixedFrame, HandSide, ReferenceFrame, ReferenceFrameProvider,
    RotationMode, TrackedFrame, Vec3,
};
pub use layout::{arc_angle, arc_angles, arc_direction, axis_values, ArcLayout, AxisRange, Layout, LineLayout};
pub use workspace::{Cell, GridCellSpace, GridIndex, Workspace};
