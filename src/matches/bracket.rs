use chrono::NaiveDate;
use log::info;
use rusqlite::Connection;

use crate::database::{matches, tournaments};
use crate::domain::{Bracket, Match, MatchId, MatchKind, MatchState, TournamentId};
use crate::errors::EngineError;

/// Creates a master match and its round matches in one transaction
pub struct BracketBuilder {
    date: NaiveDate,
    round_count: usize,
    tournament_id: Option<TournamentId>,
    duration_minutes: Option<i64>,
}

impl BracketBuilder {
    pub fn new(date: NaiveDate, round_count: usize) -> Self {
        Self {
            date,
            round_count,
            tournament_id: None,
            duration_minutes: None,
        }
    }

    pub fn for_tournament(mut self, tournament_id: Option<TournamentId>) -> Self {
        self.tournament_id = tournament_id;
        self
    }

    pub fn with_duration(mut self, minutes: Option<i64>) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn build(&self, conn: &mut Connection) -> Result<Bracket, EngineError> {
        if self.round_count == 0 {
            return Err(EngineError::InvalidRoundCount);
        }

        let tx = conn.transaction()?;

        if let Some(tournament_id) = self.tournament_id {
            if tournaments::find_by_id(&tx, tournament_id)?.is_none() {
                return Err(EngineError::not_found("tournament", tournament_id));
            }
        }

        let master_id = matches::insert_match(&tx, MatchKind::Master, self.date, None)?;
        self.link_to_tournament(&tx, master_id)?;

        let mut sub_ids = Vec::with_capacity(self.round_count);
        for _ in 0..self.round_count {
            let sub_id =
                matches::insert_match(&tx, MatchKind::Sub, self.date, self.duration_minutes)?;
            matches::link_sub(&tx, master_id, sub_id)?;
            self.link_to_tournament(&tx, sub_id)?;
            sub_ids.push(sub_id);
        }

        tx.commit()?;
        info!("Created master match {} with {} rounds", master_id, self.round_count);

        Ok(Bracket {
            master: self.fresh_match(master_id, MatchKind::Master, None),
            subs: sub_ids
                .into_iter()
                .map(|id| self.fresh_match(id, MatchKind::Sub, self.duration_minutes))
                .collect(),
        })
    }

    fn link_to_tournament(&self, conn: &Connection, match_id: MatchId) -> Result<(), EngineError> {
        if let Some(tournament_id) = self.tournament_id {
            tournaments::link_match(conn, tournament_id, match_id)?;
        }
        Ok(())
    }

    fn fresh_match(&self, id: MatchId, kind: MatchKind, duration_minutes: Option<i64>) -> Match {
        Match {
            id,
            date: self.date,
            duration_minutes,
            kind,
            state: MatchState::Ready,
            roster: Vec::new(),
            results: Vec::new(),
        }
    }
}

/// Load a master match with the sub matches it owns.
pub fn load_bracket(conn: &Connection, master_id: MatchId) -> Result<Bracket, EngineError> {
    let master = matches::find_by_id(conn, master_id)?
        .filter(|m| m.kind == MatchKind::Master)
        .ok_or_else(|| EngineError::not_found("master match", master_id))?;
    let subs = matches::list_subs(conn, master_id)?;

    Ok(Bracket { master, subs })
}
