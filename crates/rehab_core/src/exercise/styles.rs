//! The four interaction styles.

use super::{LevelContent, Stage, StyleVariant};
use crate::error::Result;
use crate::target::InteractionStyle;

/// Where a style's containers go once its targets are out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Baskets {
    None,
    Single,
    Dual,
}

fn spawn_content(
    style: InteractionStyle,
    baskets: Baskets,
    content: &LevelContent,
    stage: &mut Stage,
) -> Result<usize> {
    let frame = *stage.space.workspace().frame();
    let (cells, kinds) = match content {
        LevelContent::Level(level) => (stage.space.level_row(level), Vec::new()),
        LevelContent::Cells { cells, kinds } => (cells.clone(), kinds.clone()),
    };
    let ids = stage.spawner.spawn_at(&cells, &frame, style, &kinds)?;

    match baskets {
        Baskets::None => stage.rig.clear(),
        Baskets::Single => stage.rig.place_single(&frame, stage.containers),
        Baskets::Dual => stage.rig.place_dual(&frame, stage.containers),
    }
    Ok(ids.len())
}

fn clear_stage(stage: &mut Stage) {
    stage.spawner.clear_all();
    stage.rig.clear();
}

fn count_down(outstanding: &mut usize, style: InteractionStyle) {
    *outstanding = outstanding.saturating_sub(1);
    if *outstanding == 0 {
        log::debug!("All {} targets resolved, waiting for finish", style);
    }
}

/// Touch each target. No containers.
#[derive(Debug, Default)]
pub struct ReachStyle {
    outstanding: usize,
}

impl StyleVariant for ReachStyle {
    fn style(&self) -> InteractionStyle {
        InteractionStyle::Reach
    }

    fn spawn_level_content(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize> {
        self.outstanding = spawn_content(InteractionStyle::Reach, Baskets::None, content, stage)?;
        Ok(self.outstanding)
    }

    fn notify_success(&mut self, _succeeded: bool) {
        count_down(&mut self.outstanding, InteractionStyle::Reach);
    }

    fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn cleanup(&mut self, stage: &mut Stage) {
        self.outstanding = 0;
        clear_stage(stage);
    }
}

/// Grasp and bring into the basket zone.
#[derive(Debug, Default)]
pub struct GripStyle {
    outstanding: usize,
}

impl StyleVariant for GripStyle {
    fn style(&self) -> InteractionStyle {
        InteractionStyle::Grip
    }

    fn spawn_level_content(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize> {
        self.outstanding = spawn_content(InteractionStyle::Grip, Baskets::Single, content, stage)?;
        Ok(self.outstanding)
    }

    fn notify_success(&mut self, _succeeded: bool) {
        count_down(&mut self.outstanding, InteractionStyle::Grip);
    }

    fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn cleanup(&mut self, stage: &mut Stage) {
        self.outstanding = 0;
        clear_stage(stage);
    }
}

/// Carry and release inside the basket.
#[derive(Debug, Default)]
pub struct CarryStyle {
    outstanding: usize,
    delivered: usize,
}

impl CarryStyle {
    /// Targets released inside the basket this level.
    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl StyleVariant for CarryStyle {
    fn style(&self) -> InteractionStyle {
        InteractionStyle::Carry
    }

    fn spawn_level_content(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize> {
        self.delivered = 0;
        self.outstanding = spawn_content(InteractionStyle::Carry, Baskets::Single, content, stage)?;
        Ok(self.outstanding)
    }

    fn notify_success(&mut self, succeeded: bool) {
        if succeeded {
            self.delivered += 1;
        }
        count_down(&mut self.outstanding, InteractionStyle::Carry);
    }

    fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn cleanup(&mut self, stage: &mut Stage) {
        self.outstanding = 0;
        clear_stage(stage);
    }
}

/// Release healthy and rotten targets into their own baskets.
#[derive(Debug, Default)]
pub struct SortStyle {
    outstanding: usize,
    sorted: usize,
}

impl SortStyle {
    pub fn sorted(&self) -> usize {
        self.sorted
    }
}

impl StyleVariant for SortStyle {
    fn style(&self) -> InteractionStyle {
        InteractionStyle::Sort
    }

    fn spawn_level_content(&mut self, content: &LevelContent, stage: &mut Stage) -> Result<usize> {
        self.sorted = 0;
        self.outstanding = spawn_content(InteractionStyle::Sort, Baskets::Dual, content, stage)?;
        Ok(self.outstanding)
    }

    fn notify_success(&mut self, succeeded: bool) {
        if succeeded {
            self.sorted += 1;
        }
        count_down(&mut self.outstanding, InteractionStyle::Sort);
    }

    fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn cleanup(&mut self, stage: &mut Stage) {
        self.outstanding = 0;
        clear_stage(stage);
    }
}

pub fn variant_for(style: InteractionStyle) -> Box<dyn StyleVariant> {
    match style {
        InteractionStyle::Reach => Box::new(ReachStyle::default()),
        InteractionStyle::Grip => Box::new(GripStyle::default()),
        InteractionStyle::Carry => Box::new(CarryStyle::default()),
        InteractionStyle::Sort => Box::new(SortStyle::default()),
    }
}
