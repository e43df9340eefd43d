//! Cell generation against a reference frame.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::frame::{HandSide, ReferenceFrame, Vec3};
use super::layout::{arc_angle, arc_direction, axis_values, ArcLayout, Layout, LineLayout};
use crate::config::{GridConfig, LevelDescriptor};

/// Logical cell coordinate. The stable key for outcome lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridIndex {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for GridIndex {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One logical position plus its offset from the frame origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub grid_index: GridIndex,
    pub world_offset: Vec3,
}

/// Cells generated for one frame. Read-only to everything but
/// [`GridCellSpace`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workspace {
    frame: ReferenceFrame,
    cells: Vec<Cell>,
}

impl Workspace {
    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn grid_indices(&self) -> Vec<GridIndex> {
        self.cells.iter().map(|c| c.grid_index).collect()
    }

    pub fn get(&self, index: GridIndex) -> Option<&Cell> {
        self.cells.iter().find(|c| c.grid_index == index)
    }

    pub fn world_position(&self, cell: &Cell) -> Vec3 {
        self.frame.position + cell.world_offset
    }
}

/// Collects cells for one generation pass, skipping duplicate indices.
struct CellSink {
    seen: HashSet<GridIndex>,
    cells: Vec<Cell>,
    shift: Vec3,
}

impl CellSink {
    fn new(shift: Vec3) -> Self {
        Self { seen: HashSet::new(), cells: Vec::new(), shift }
    }

    fn push(&mut self, grid_index: GridIndex, offset: Vec3) {
        if !self.seen.insert(grid_index) {
            log::warn!("Duplicate grid index {} during generation, skipping", grid_index);
            return;
        }
        self.cells.push(Cell { grid_index, world_offset: offset + self.shift });
    }
}

/// Pure geometry over a layout and hand side. Holds the current workspace.
#[derive(Debug, Clone)]
pub struct GridCellSpace {
    config: GridConfig,
    workspace: Workspace,
}

impl GridCellSpace {
    pub fn new(config: GridConfig) -> Self {
        let mut space = Self { config, workspace: Workspace::default() };
        space.rebuild(&ReferenceFrame::identity());
        space
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn set_hand(&mut self, hand: HandSide) {
        self.config.hand = hand;
        let frame = self.workspace.frame;
        self.rebuild(&frame);
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.config.layout = layout;
        let frame = self.workspace.frame;
        self.rebuild(&frame);
    }

    /// Regenerate against `frame` and return the new workspace.
    pub fn rebuild(&mut self, frame: &ReferenceFrame) -> &Workspace {
        self.workspace = Workspace { frame: *frame, cells: self.generate(frame) };
        log::debug!("Workspace rebuilt: {} cells", self.workspace.len());
        &self.workspace
    }

    /// Full cell set for `frame`. Deterministic for identical inputs.
    pub fn generate(&self, frame: &ReferenceFrame) -> Vec<Cell> {
        let mut sink = CellSink::new(self.hand_shift(frame));
        match &self.config.layout {
            Layout::Line(line) => {
                let (xs, ys, zs) = (line.x.values(), line.y.values(), line.z.values());
                for (yi, y) in ys.iter().enumerate() {
                    for (zi, z) in zs.iter().enumerate() {
                        for (xi, x) in xs.iter().enumerate() {
                            let index = GridIndex::new(xi as i32, yi as i32, zi as i32);
                            sink.push(index, line_offset(frame, *x, *y, *z));
                        }
                    }
                }
            }
            Layout::Arc(arc) => {
                for layer in 0..arc.layer_count.max(1) {
                    for vi in 0..arc.vertical_count.max(1) {
                        for hi in 0..arc.horizontal_count.max(1) {
                            let index = GridIndex::new(hi as i32, vi as i32, layer as i32);
                            sink.push(index, arc_offset(frame, arc, hi, vi, layer));
                        }
                    }
                }
            }
        }
        sink.cells
    }

    /// Cells for explicit logical indices against the current workspace
    /// frame. Out-of-range components are clamped; post-clamp duplicates
    /// are skipped.
    pub fn cells_for(&self, indices: &[GridIndex]) -> Vec<Cell> {
        let frame = self.workspace.frame;
        let mut sink = CellSink::new(self.hand_shift(&frame));
        for index in indices {
            let (clamped, offset) = self.locate(&frame, *index);
            if clamped != *index {
                log::debug!("Grid index {} clamped to {}", index, clamped);
            }
            sink.push(clamped, offset);
        }
        sink.cells
    }

    /// World offset (without hand shift) of a clamped logical index.
    fn locate(&self, frame: &ReferenceFrame, index: GridIndex) -> (GridIndex, Vec3) {
        match &self.config.layout {
            Layout::Line(line) => {
                let (xi, yi, zi) =
                    (line.x.clamp_index(index.x), line.y.clamp_index(index.y), line.z.clamp_index(index.z));
                let (xs, ys, zs) = (line.x.values(), line.y.values(), line.z.values());
                let clamped = GridIndex::new(xi as i32, yi as i32, zi as i32);
                (clamped, line_offset(frame, xs[xi], ys[yi], zs[zi]))
            }
            Layout::Arc(arc) => {
                let hi = clamp_count(index.x, arc.horizontal_count);
                let vi = clamp_count(index.y, arc.vertical_count);
                let layer = clamp_count(index.z, arc.layer_count);
                let clamped = GridIndex::new(hi as i32, vi as i32, layer as i32);
                (clamped, arc_offset(frame, arc, hi, vi, layer))
            }
        }
    }

    /// One row of `level.target_count` cells for a level descriptor.
    pub fn level_row(&self, level: &LevelDescriptor) -> Vec<Cell> {
        let frame = self.workspace.frame;
        let mut sink = CellSink::new(self.hand_shift(&frame));
        let count = level.target_count;
        match &self.config.layout {
            Layout::Line(line) => {
                let xs = axis_values(line.x.min, line.x.max, count);
                for (i, x) in xs.iter().take(count).enumerate() {
                    let offset = line_offset(&frame, *x, level.height_offset, level.distance);
                    sink.push(GridIndex::new(i as i32, 0, 0), offset);
                }
            }
            Layout::Arc(arc) => {
                let radius = level.distance.max(0.0);
                for i in 0..count {
                    let angle = arc_angle(i, count, level.arc_span_degrees);
                    let dir = arc_direction(&frame.forward, &frame.right, &frame.up, angle, 0.0);
                    let offset = frame.local_to_offset(&arc.center)
                        + frame.up * level.height_offset
                        + dir * radius;
                    sink.push(GridIndex::new(i as i32, 0, 0), offset);
                }
            }
        }
        sink.cells
    }

    fn hand_shift(&self, frame: &ReferenceFrame) -> Vec3 {
        frame.right * (self.config.hand_offset * self.config.hand.sign())
    }
}

fn clamp_count(index: i32, count: usize) -> usize {
    index.clamp(0, count.max(1) as i32 - 1) as usize
}

fn line_offset(frame: &ReferenceFrame, x: f32, y: f32, z: f32) -> Vec3 {
    frame.right * x + frame.up * y + frame.forward * z
}

fn arc_offset(frame: &ReferenceFrame, arc: &ArcLayout, hi: usize, vi: usize, layer: usize) -> Vec3 {
    let h = arc_angle(hi, arc.horizontal_count, arc.horizontal_span_deg);
    let v = arc_angle(vi, arc.vertical_count, arc.vertical_span_deg);
    let dir = arc_direction(&frame.forward, &frame.right, &frame.up, h, v);
    frame.local_to_offset(&arc.center) + dir * arc.radius(layer)
}

impl From<LineLayout> for Layout {
    fn from(line: LineLayout) -> Self {
        Layout::Line(line)
    }
}

impl From<ArcLayout> for Layout {
    fn from(arc: ArcLayout) -> Self {
        Layout::Arc(arc)
    }
}
