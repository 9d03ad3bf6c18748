//! Staged progress shown while the coordinator call is outstanding.
//!
//! The agent service sends no progress events, so the stages advance on a
//! timer: one per specialist, then synthesis. They say nothing about how far
//! the real request has got.

use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_STAGE_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Liquidity,
    Operational,
    Sustainability,
    Auditor,
    Synthesis,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Liquidity,
        Stage::Operational,
        Stage::Sustainability,
        Stage::Auditor,
        Stage::Synthesis,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        match self {
            Stage::Liquidity => 0,
            Stage::Operational => 1,
            Stage::Sustainability => 2,
            Stage::Auditor => 3,
            Stage::Synthesis => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Liquidity => "Liquidity",
            Stage::Operational => "Operational",
            Stage::Sustainability => "Sustainability",
            Stage::Auditor => "Auditor",
            Stage::Synthesis => "Synthesis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Complete,
    Active,
    Pending,
}

pub fn stage_status(stage: Stage, current: usize) -> StageStatus {
    let index = stage.index();
    if index < current {
        StageStatus::Complete
    } else if index == current {
        StageStatus::Active
    } else {
        StageStatus::Pending
    }
}

/// Progress bar fill for the active stage, 20..=100.
pub fn stage_percent(current: usize) -> u8 {
    let shown = current.min(Stage::COUNT - 1) + 1;
    ((shown * 100) / Stage::COUNT) as u8
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressSimulator {
    interval: Duration,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_INTERVAL)
    }
}

impl ProgressSimulator {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time until the whole sequence has been shown.
    pub fn total_duration(&self) -> Duration {
        self.interval * Stage::COUNT as u32
    }

    /// Reports every stage in order, holding each for one interval. Dropping
    /// the future stops further reports.
    pub async fn run<F>(&self, mut on_stage: F)
    where
        F: FnMut(Stage),
    {
        for stage in Stage::ALL {
            on_stage(stage);
            tokio::time::sleep(self.interval).await;
        }
    }
}
