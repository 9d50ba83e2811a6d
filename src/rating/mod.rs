pub mod calculator;
pub mod points;
pub mod types;

pub use calculator::{count_placements, leaderboard, rate_player};
pub use points::calculate_points;
pub use types::{PlacementCounts, PlayerRating};
