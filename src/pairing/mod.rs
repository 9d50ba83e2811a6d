use std::collections::BTreeSet;

use log::debug;
use rusqlite::Connection;

use crate::database::{matches, tournaments};
use crate::domain::{Match, PlayerId, TournamentId};
use crate::errors::EngineError;

/// Opponents a player already met, derived from finished match result rosters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PairingRecord {
    opponents: BTreeSet<PlayerId>,
}

impl PairingRecord {
    pub fn from_history(player_id: PlayerId, history: &[Match]) -> Self {
        let opponents = history
            .iter()
            .filter(|m| m.result_players().any(|id| id == player_id))
            .flat_map(|m| m.result_players())
            .filter(|&id| id != player_id)
            .collect();

        Self { opponents }
    }

    pub fn has_faced(&self, player_id: PlayerId) -> bool {
        self.opponents.contains(&player_id)
    }

    pub fn opponents(&self) -> &BTreeSet<PlayerId> {
        &self.opponents
    }
}

/// Pick the next opponent for `player_id` among `participants`.
///
/// `participants` carries each member's current points. Players already met
/// in `history` are skipped; among the rest the lowest points win, with the
/// lower id breaking ties.
pub fn select_opponent(
    tournament_id: TournamentId,
    player_id: PlayerId,
    participants: &[(PlayerId, i64)],
    history: &[Match],
) -> Result<PlayerId, EngineError> {
    if !participants.iter().any(|&(id, _)| id == player_id) {
        return Err(EngineError::InvalidParticipant {
            tournament_id,
            player_id,
        });
    }

    let record = PairingRecord::from_history(player_id, history);

    participants
        .iter()
        .filter(|&&(id, _)| id != player_id && !record.has_faced(id))
        .min_by_key(|&&(id, points)| (points, id))
        .map(|&(id, _)| id)
        .ok_or(EngineError::NoOpponentAvailable {
            tournament_id,
            player_id,
        })
}

/// Load the tournament's roster and history, then select an opponent.
pub fn find_opponent(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<PlayerId, EngineError> {
    if tournaments::find_by_id(conn, tournament_id)?.is_none() {
        return Err(EngineError::not_found("tournament", tournament_id));
    }

    let participants = tournaments::list_participant_points(conn, tournament_id)?;
    let history = matches::list_finished_subs_for_tournament(conn, tournament_id)?;

    let opponent = select_opponent(tournament_id, player_id, &participants, &history)?;
    debug!(
        "Paired player {} with {} in tournament {}",
        player_id, opponent, tournament_id
    );
    Ok(opponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchKind, MatchResult, MatchState, Placement};
    use chrono::NaiveDate;

    fn finished(id: i64, players: &[(PlayerId, u8)]) -> Match {
        Match {
            id,
            date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            duration_minutes: None,
            kind: MatchKind::Sub,
            state: MatchState::Finished,
            roster: players.iter().map(|&(id, _)| id).collect(),
            results: players
                .iter()
                .map(|&(player_id, p)| MatchResult {
                    player_id,
                    placement: Placement::new(p).unwrap(),
                })
                .collect(),
        }
    }

    #[test]
    fn skips_opponents_already_met() {
        let participants = [(1, 0), (2, 0), (3, 0)];
        let history = [finished(10, &[(1, 4), (2, 1)])];

        assert_eq!(select_opponent(5, 1, &participants, &history).unwrap(), 3);
    }

    #[test]
    fn prefers_lowest_points_then_lowest_id() {
        let participants = [(1, 0), (2, 7), (3, -2), (4, -2), (5, 1)];

        assert_eq!(select_opponent(5, 1, &participants, &[]).unwrap(), 3);
    }

    #[test]
    fn exhausted_roster_reports_no_opponent() {
        let participants = [(1, 0), (2, 0), (3, 0)];
        let history = [finished(10, &[(1, 4), (2, 1)]), finished(11, &[(3, 2), (1, 3)])];

        assert!(matches!(
            select_opponent(5, 1, &participants, &history),
            Err(EngineError::NoOpponentAvailable { tournament_id: 5, player_id: 1 })
        ));
    }

    #[test]
    fn outsider_is_rejected() {
        let participants = [(1, 0), (2, 0)];

        assert!(matches!(
            select_opponent(5, 9, &participants, &[]),
            Err(EngineError::InvalidParticipant { tournament_id: 5, player_id: 9 })
        ));
    }

    #[test]
    fn matches_without_the_player_do_not_count() {
        let history = [finished(10, &[(2, 4), (3, 1)])];
        let record = PairingRecord::from_history(1, &history);

        assert!(record.opponents().is_empty());
    }
}
