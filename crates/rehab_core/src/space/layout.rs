//! Layout parameters: line lattice or multi-layer spherical arc.
//!
//! All distances are metres in the reference frame's axes (x = right,
//! y = up, z = forward). Angles are degrees, sampled symmetrically around 0.

use serde::{Deserialize, Serialize};

use super::frame::Vec3;

/// One sampled axis: `count` equally spaced values from `min` to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

impl AxisRange {
    pub fn new(min: f32, max: f32, count: usize) -> Self {
        Self { min, max, count }
    }

    /// A single fixed value.
    pub fn fixed(value: f32) -> Self {
        Self { min: value, max: value, count: 1 }
    }

    /// Sampled values. `count <= 1` yields the midpoint.
    pub fn values(&self) -> Vec<f32> {
        axis_values(self.min, self.max, self.count)
    }

    /// Clamp a logical index into `0..count`.
    pub fn clamp_index(&self, index: i32) -> usize {
        let last = self.count.max(1) as i32 - 1;
        index.clamp(0, last) as usize
    }
}

pub fn axis_values(min: f32, max: f32, count: usize) -> Vec<f32> {
    if count <= 1 {
        return vec![(min + max) * 0.5];
    }
    let step = (max - min) / (count - 1) as f32;
    (0..count).map(|i| min + step * i as f32).collect()
}

/// Angle of sample `index` out of `count` spread over `span_deg`, centred on 0.
pub fn arc_angle(index: usize, count: usize, span_deg: f32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let step = span_deg / (count - 1) as f32;
    -span_deg * 0.5 + step * index as f32
}

pub fn arc_angles(count: usize, span_deg: f32) -> Vec<f32> {
    (0..count.max(1)).map(|i| arc_angle(i, count, span_deg)).collect()
}

/// Unit direction after yawing `forward` by `h_deg` toward `right` and
/// pitching it by `v_deg` toward `up`.
pub fn arc_direction(forward: &Vec3, right: &Vec3, up: &Vec3, h_deg: f32, v_deg: f32) -> Vec3 {
    let (h, v) = (h_deg.to_radians(), v_deg.to_radians());
    let horizontal = forward * h.cos() + right * h.sin();
    let dir = horizontal * v.cos() + up * v.sin();
    if dir.norm_squared() < 1e-12 {
        return *forward;
    }
    dir.normalize()
}

/// Rectangular lattice along the frame axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLayout {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Default for LineLayout {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-0.40, 0.40, 8),
            y: AxisRange::new(-0.10, 0.40, 5),
            z: AxisRange::new(0.60, 1.80, 5),
        }
    }
}

impl LineLayout {
    /// A single row of `count` cells at fixed height and depth.
    pub fn row(x_min: f32, x_max: f32, count: usize, y: f32, z: f32) -> Self {
        Self { x: AxisRange::new(x_min, x_max, count), y: AxisRange::fixed(y), z: AxisRange::fixed(z) }
    }

    pub fn cell_count(&self) -> usize {
        self.x.count.max(1) * self.y.count.max(1) * self.z.count.max(1)
    }
}

/// Concentric shells of samples around `center` (frame-local offset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcLayout {
    pub horizontal_count: usize,
    pub horizontal_span_deg: f32,
    pub vertical_count: usize,
    pub vertical_span_deg: f32,
    pub layer_count: usize,
    pub base_radius: f32,
    pub layer_spacing: f32,
    #[serde(default = "zero_vec")]
    pub center: Vec3,
}

fn zero_vec() -> Vec3 {
    Vec3::zeros()
}

impl Default for ArcLayout {
    fn default() -> Self {
        Self {
            horizontal_count: 8,
            horizontal_span_deg: 90.0,
            vertical_count: 3,
            vertical_span_deg: 40.0,
            layer_count: 3,
            base_radius: 0.45,
            layer_spacing: 0.15,
            center: Vec3::zeros(),
        }
    }
}

impl ArcLayout {
    pub fn radius(&self, layer: usize) -> f32 {
        (self.base_radius + self.layer_spacing * layer as f32).max(0.0)
    }

    pub fn cell_count(&self) -> usize {
        self.horizontal_count.max(1) * self.vertical_count.max(1) * self.layer_count.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    Line(LineLayout),
    Arc(ArcLayout),
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Line(LineLayout::default())
    }
}

impl Layout {
    pub fn cell_count(&self) -> usize {
        match self {
            Layout::Line(line) => line.cell_count(),
            Layout::Arc(arc) => arc.cell_count(),
        }
    }

    pub fn is_arc(&self) -> bool {
        matches!(self, Layout::Arc(_))
    }
}
