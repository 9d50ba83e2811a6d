use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Placement, PlayerId};

/// How often a player finished at each placement
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlacementCounts {
    counts: [u32; Placement::MAX as usize],
}

impl PlacementCounts {
    pub fn record(&mut self, placement: Placement) {
        self.counts[placement.value() as usize - 1] += 1;
    }

    /// Number of matches finished at `placement` (1..=4); zero otherwise.
    pub fn count(&self, placement: u8) -> u32 {
        Placement::new(placement)
            .map(|p| self.counts[p.value() as usize - 1])
            .unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

impl FromIterator<Placement> for PlacementCounts {
    fn from_iter<I: IntoIterator<Item = Placement>>(iter: I) -> Self {
        let mut counts = Self::default();
        for placement in iter {
            counts.record(placement);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub player_id: PlayerId,
    pub points: i64,
    pub matches_counted: u32,
    pub last_rated: NaiveDate,
}
