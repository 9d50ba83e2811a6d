use chrono::NaiveDate;
use rusqlite::Connection;

use super::points::calculate_points;
use super::types::{PlacementCounts, PlayerRating};
use crate::database::{matches, players};
use crate::domain::{LeaderboardEntry, Match, PlayerId};
use crate::errors::EngineError;

/// Count the placements a player reached across `history`.
///
/// Matches without a result entry for the player are ignored.
pub fn count_placements(
    player_id: PlayerId,
    history: &[Match],
) -> Result<PlacementCounts, EngineError> {
    let mut counts = PlacementCounts::default();
    for m in history {
        if let Some(placement) = m.placement_of(player_id)? {
            counts.record(placement);
        }
    }
    Ok(counts)
}

/// Recompute a player's points from their finished matches and store them.
///
/// The stored value is replaced, never incremented.
pub fn rate_player(
    conn: &Connection,
    player_id: PlayerId,
    today: NaiveDate,
) -> Result<PlayerRating, EngineError> {
    let history = matches::list_finished_with_player(conn, player_id)?;
    let counts = count_placements(player_id, &history)?;
    let points = calculate_points(&counts);

    players::update_rating(conn, player_id, points, today)?;

    Ok(PlayerRating {
        player_id,
        points,
        matches_counted: counts.total(),
        last_rated: today,
    })
}

pub fn leaderboard(conn: &Connection, limit: usize) -> Result<Vec<LeaderboardEntry>, EngineError> {
    Ok(players::list_leaderboard(conn, limit)?)
}
