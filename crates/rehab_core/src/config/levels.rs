//! Level descriptors per interaction style

use serde::{Deserialize, Serialize};

use crate::target::InteractionStyle;

/// One level of practice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Targets in the row
    pub target_count: usize,
    /// Row height relative to the head, metres (+ up)
    pub height_offset: f32,
    /// Row depth in front of the head, metres
    pub distance: f32,
    /// Arc width for arc layouts, degrees
    pub arc_span_degrees: f32,
}

impl LevelDescriptor {
    pub fn new(target_count: usize, height_offset: f32, distance: f32, arc_span_degrees: f32) -> Self {
        Self { target_count, height_offset, distance, arc_span_degrees }
    }
}

/// Supplies the ordered level list for a style.
pub trait LevelConfigSource {
    fn levels(&self, style: InteractionStyle) -> Vec<LevelDescriptor>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCatalog {
    pub reach: Vec<LevelDescriptor>,
    pub grip: Vec<LevelDescriptor>,
    pub carry: Vec<LevelDescriptor>,
    pub sort: Vec<LevelDescriptor>,
}

impl LevelCatalog {
    /// The same progression for every style.
    pub fn shared(levels: Vec<LevelDescriptor>) -> Self {
        Self { reach: levels.clone(), grip: levels.clone(), carry: levels.clone(), sort: levels }
    }

    pub fn for_style(&self, style: InteractionStyle) -> &[LevelDescriptor] {
        match style {
            InteractionStyle::Reach => &self.reach,
            InteractionStyle::Grip => &self.grip,
            InteractionStyle::Carry => &self.carry,
            InteractionStyle::Sort => &self.sort,
        }
    }

    pub fn for_style_mut(&mut self, style: InteractionStyle) -> &mut Vec<LevelDescriptor> {
        match style {
            InteractionStyle::Reach => &mut self.reach,
            InteractionStyle::Grip => &mut self.grip,
            InteractionStyle::Carry => &mut self.carry,
            InteractionStyle::Sort => &mut self.sort,
        }
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::shared(vec![
            LevelDescriptor::new(5, -0.20, 0.45, 60.0),
            LevelDescriptor::new(6, -0.10, 0.55, 75.0),
            LevelDescriptor::new(7, 0.00, 0.65, 90.0),
            LevelDescriptor::new(8, 0.10, 0.75, 105.0),
            LevelDescriptor::new(8, 0.20, 0.85, 120.0),
        ])
    }
}

impl LevelConfigSource for LevelCatalog {
    fn levels(&self, style: InteractionStyle) -> Vec<LevelDescriptor> {
        self.for_style(style).to_vec()
    }
}
