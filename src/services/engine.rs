use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};
use rusqlite::Connection;

use crate::clock::Clock;
use crate::config::EngineSettings;
use crate::database::{self, matches, players, tournaments, DbPool};
use crate::domain::{
    Bracket, LeaderboardEntry, Match, MatchId, MatchKind, MatchResult, MatchState, NewTournament,
    Placement, Player, PlayerId, ResultEntry, Tournament, TournamentId, TournamentUpdate,
};
use crate::errors::{EngineError, ResultMismatch};
use crate::maintenance::AdmissionGate;
use crate::matches::{load_bracket, transition, BracketBuilder};
use crate::{pairing, rating};

/// Entry point for every tournament operation.
///
/// Each call takes a single pooled connection and runs its writes inside one
/// transaction.
#[derive(Clone)]
pub struct TournamentEngine {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    gate: AdmissionGate,
    settings: EngineSettings,
}

impl TournamentEngine {
    pub fn new(
        pool: DbPool,
        clock: Arc<dyn Clock>,
        gate: AdmissionGate,
        settings: EngineSettings,
    ) -> Self {
        Self {
            pool,
            clock,
            gate,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_admitting(&self) -> bool {
        self.gate.is_admitting()
    }

    pub fn register_player(&self, username: &str) -> Result<Player, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        let player = players::insert_player(&conn, username)?;
        info!("Registered player {} ({})", player.username, player.id);
        Ok(player)
    }

    pub fn get_player(&self, player_id: PlayerId) -> Result<Player, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        players::find_by_id(&conn, player_id)?
            .ok_or_else(|| EngineError::not_found("player", player_id))
    }

    pub fn create_tournament(&self, new: &NewTournament) -> Result<Tournament, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        if !players::exists(&tx, new.maintainer_id)? {
            return Err(EngineError::not_found("player", new.maintainer_id));
        }
        let tournament_id = tournaments::insert_tournament(&tx, new)?;
        for player_id in &new.players {
            if !players::exists(&tx, *player_id)? {
                return Err(EngineError::not_found("player", *player_id));
            }
            tournaments::add_player(&tx, tournament_id, *player_id)?;
        }

        let tournament = tournaments::find_by_id(&tx, tournament_id)?
            .ok_or_else(|| EngineError::not_found("tournament", tournament_id))?;
        tx.commit()?;

        info!("Created tournament '{}' ({})", tournament.name, tournament.id);
        Ok(tournament)
    }

    /// Replace name, dates and maintainer. Participants and matches stay.
    pub fn edit_tournament(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> Result<Tournament, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        if !players::exists(&tx, update.maintainer_id)? {
            return Err(EngineError::not_found("player", update.maintainer_id));
        }
        if !tournaments::update_tournament(&tx, tournament_id, update)? {
            return Err(EngineError::not_found("tournament", tournament_id));
        }

        let tournament = tournaments::find_by_id(&tx, tournament_id)?
            .ok_or_else(|| EngineError::not_found("tournament", tournament_id))?;
        tx.commit()?;

        info!("Updated tournament '{}' ({})", tournament.name, tournament.id);
        Ok(tournament)
    }

    pub fn get_tournament(&self, tournament_id: TournamentId) -> Result<Tournament, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        tournaments::find_by_id(&conn, tournament_id)?
            .ok_or_else(|| EngineError::not_found("tournament", tournament_id))
    }

    /// All tournaments ordered by start date, optionally only those run by
    /// `maintainer_id`
    pub fn list_tournaments(
        &self,
        maintainer_id: Option<PlayerId>,
        limit: usize,
    ) -> Result<Vec<Tournament>, EngineError> {
        let conn = database::get_connection(&self.pool)?;

        Ok(tournaments::list_all(&conn)?
            .into_iter()
            .filter(|t| maintainer_id.is_none_or(|id| t.maintainer_id == id))
            .take(limit)
            .collect())
    }

    pub fn tournament_matches(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Match>, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        if tournaments::find_by_id(&conn, tournament_id)?.is_none() {
            return Err(EngineError::not_found("tournament", tournament_id));
        }
        Ok(matches::list_for_tournament(&conn, tournament_id)?)
    }

    /// Adding a player twice is a no-op.
    pub fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<Tournament, EngineError> {
        let conn = database::get_connection(&self.pool)?;

        if tournaments::find_by_id(&conn, tournament_id)?.is_none() {
            return Err(EngineError::not_found("tournament", tournament_id));
        }
        if !players::exists(&conn, player_id)? {
            return Err(EngineError::not_found("player", player_id));
        }

        if !tournaments::add_player(&conn, tournament_id, player_id)? {
            warn!("Player {} already participates in tournament {}", player_id, tournament_id);
        }

        tournaments::find_by_id(&conn, tournament_id)?
            .ok_or_else(|| EngineError::not_found("tournament", tournament_id))
    }

    /// Tournaments that have not ended yet, earliest start first
    pub fn active_tournaments(&self, limit: usize) -> Result<Vec<Tournament>, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        let today = self.clock.today();

        Ok(tournaments::list_all(&conn)?
            .into_iter()
            .filter(|t| t.is_active(today))
            .take(limit)
            .collect())
    }

    pub fn create_match(
        &self,
        tournament_id: Option<TournamentId>,
        round_count: usize,
    ) -> Result<Bracket, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        BracketBuilder::new(self.clock.today(), round_count)
            .for_tournament(tournament_id)
            .build(&mut conn)
    }

    /// Put a player on a sub match roster while the match is still ready.
    ///
    /// A match linked to tournaments only accepts their participants.
    pub fn enter_player(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
    ) -> Result<Match, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        let m = load_match(&tx, match_id)?;
        ensure_scorable(&m)?;
        if m.state != MatchState::Ready {
            return Err(EngineError::RosterLocked {
                match_id,
                state: m.state,
            });
        }
        if !players::exists(&tx, player_id)? {
            return Err(EngineError::not_found("player", player_id));
        }
        for tournament_id in tournaments::list_for_match(&tx, match_id)? {
            if !tournaments::is_participant(&tx, tournament_id, player_id)? {
                return Err(EngineError::InvalidParticipant {
                    tournament_id,
                    player_id,
                });
            }
        }

        if !matches::add_player(&tx, match_id, player_id)? {
            warn!("Player {} is already on the roster of match {}", player_id, match_id);
        }

        let updated = load_match(&tx, match_id)?;
        tx.commit()?;
        Ok(updated)
    }

    pub fn get_match(&self, match_id: MatchId) -> Result<Match, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        load_match(&conn, match_id)
    }

    pub fn get_bracket(&self, master_id: MatchId) -> Result<Bracket, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        load_bracket(&conn, master_id)
    }

    pub fn transition_match(
        &self,
        match_id: MatchId,
        next: MatchState,
    ) -> Result<Match, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        let mut m = load_match(&tx, match_id)?;
        let previous = m.state;
        transition(&mut m, next)?;
        matches::update_state(&tx, match_id, next)?;
        tx.commit()?;

        info!("Match {} moved from {} to {}", match_id, previous, next);
        Ok(m)
    }

    pub fn find_opponent(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<PlayerId, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        pairing::find_opponent(&conn, tournament_id, player_id)
    }

    /// Store the final ranking of a running or paused sub match and finish it.
    ///
    /// Nothing is written unless every entry passes validation.
    pub fn record_result(
        &self,
        match_id: MatchId,
        entries: &[ResultEntry],
    ) -> Result<Match, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        let mut m = load_match(&tx, match_id)?;
        ensure_scorable(&m)?;
        if !matches!(m.state, MatchState::Running | MatchState::Paused) {
            return Err(EngineError::MatchNotInPlay {
                match_id,
                state: m.state,
            });
        }

        let results = validate_results(&m.roster, entries)?;
        matches::insert_results(&tx, match_id, &results)?;
        transition(&mut m, MatchState::Finished)?;
        matches::update_state(&tx, match_id, MatchState::Finished)?;
        tx.commit()?;

        m.results = results;
        info!("Recorded {} results for match {}", m.results.len(), match_id);
        Ok(m)
    }

    pub fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let conn = database::get_connection(&self.pool)?;
        rating::leaderboard(&conn, limit.min(self.settings.max_leaderboard_limit))
    }
}

fn load_match(conn: &Connection, match_id: MatchId) -> Result<Match, EngineError> {
    matches::find_by_id(conn, match_id)?.ok_or_else(|| EngineError::not_found("match", match_id))
}

/// Only sub matches carry rosters and results.
fn ensure_scorable(m: &Match) -> Result<(), EngineError> {
    match m.kind {
        MatchKind::Sub => Ok(()),
        MatchKind::Master => Err(EngineError::MasterNotScorable { match_id: m.id }),
    }
}

fn validate_results(
    roster: &[PlayerId],
    entries: &[ResultEntry],
) -> Result<Vec<MatchResult>, EngineError> {
    if entries.len() != roster.len() {
        return Err(EngineError::ResultMismatch(ResultMismatch::RosterSize {
            expected: roster.len(),
            actual: entries.len(),
        }));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .map(|entry| {
            let placement = Placement::try_from(entry.rank).map_err(|_| {
                EngineError::ResultMismatch(ResultMismatch::PlacementOutOfRange {
                    player_id: entry.player_id,
                    placement: entry.rank,
                })
            })?;
            if !roster.contains(&entry.player_id) {
                let reason = ResultMismatch::NotOnRoster(entry.player_id);
                return Err(EngineError::ResultMismatch(reason));
            }
            if !seen.insert(entry.player_id) {
                let reason = ResultMismatch::DuplicatePlayer(entry.player_id);
                return Err(EngineError::ResultMismatch(reason));
            }
            Ok(MatchResult {
                player_id: entry.player_id,
                placement,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player_id: PlayerId, rank: i64) -> ResultEntry {
        ResultEntry { player_id, rank }
    }

    fn mismatch(result: Result<Vec<MatchResult>, EngineError>) -> ResultMismatch {
        match result {
            Err(EngineError::ResultMismatch(reason)) => reason,
            other => panic!("expected a result mismatch, got {:?}", other),
        }
    }

    #[test]
    fn accepts_a_complete_ranking() {
        let entries = [entry(3, 4), entry(1, 1), entry(2, 2)];
        let results = validate_results(&[1, 2, 3], &entries).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].player_id, 3);
        assert_eq!(results[0].placement.value(), 4);
    }

    #[test]
    fn rejects_missing_players() {
        assert_eq!(
            mismatch(validate_results(&[1, 2, 3], &[entry(1, 1), entry(2, 2)])),
            ResultMismatch::RosterSize { expected: 3, actual: 2 }
        );
    }

    #[test]
    fn rejects_strangers_and_duplicates() {
        assert_eq!(
            mismatch(validate_results(&[1, 2], &[entry(1, 1), entry(9, 2)])),
            ResultMismatch::NotOnRoster(9)
        );
        assert_eq!(
            mismatch(validate_results(&[1, 2], &[entry(1, 1), entry(1, 2)])),
            ResultMismatch::DuplicatePlayer(1)
        );
    }

    #[test]
    fn rejects_ranks_outside_one_to_four() {
        assert_eq!(
            mismatch(validate_results(&[1, 2], &[entry(1, 0), entry(2, 2)])),
            ResultMismatch::PlacementOutOfRange { player_id: 1, placement: 0 }
        );
        assert_eq!(
            mismatch(validate_results(&[1], &[entry(1, 5)])),
            ResultMismatch::PlacementOutOfRange { player_id: 1, placement: 5 }
        );
    }
}
