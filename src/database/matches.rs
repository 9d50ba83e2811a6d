use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{
    Match, MatchId, MatchKind, MatchResult, MatchState, Placement, PlayerId, TournamentId,
};

const MATCH_COLUMNS: &str = "m.id, m.date, m.duration_minutes, m.kind, m.state";

pub fn insert_match(
    conn: &Connection,
    kind: MatchKind,
    date: NaiveDate,
    duration_minutes: Option<i64>,
) -> Result<MatchId> {
    let sql = "INSERT INTO matches (kind, date, duration_minutes, state) \
               VALUES (?1, ?2, ?3, ?4) RETURNING id";

    conn.query_row(
        sql,
        params![kind.as_str(), date, duration_minutes, MatchState::Ready.as_str()],
        |row| row.get::<_, MatchId>(0),
    )
    .context("Failed to insert match")
}

pub fn link_sub(conn: &Connection, master_id: MatchId, sub_id: MatchId) -> Result<()> {
    conn.execute(
        "INSERT INTO match_links (master_id, sub_id) VALUES (?1, ?2)",
        params![master_id, sub_id],
    )
    .with_context(|| format!("Failed to link sub match {} to master {}", sub_id, master_id))
    .map(|_| ())
}

fn parse_text_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
    })
}

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        date: row.get(1)?,
        duration_minutes: row.get(2)?,
        kind: parse_text_column(row, 3)?,
        state: parse_text_column(row, 4)?,
        roster: Vec::new(),
        results: Vec::new(),
    })
}

fn parse_result_row(row: &rusqlite::Row) -> rusqlite::Result<MatchResult> {
    let raw: i64 = row.get(1)?;
    let placement = Placement::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, e.into()))?;

    Ok(MatchResult {
        player_id: row.get(0)?,
        placement,
    })
}

fn load_details(conn: &Connection, m: &mut Match) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT player_id FROM match_players WHERE match_id = ?1 ORDER BY rowid")?;
    m.roster = stmt
        .query_map(params![m.id], |row| row.get::<_, PlayerId>(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT player_id, placement FROM match_results WHERE match_id = ?1 ORDER BY position",
    )?;
    m.results = stmt
        .query_map(params![m.id], parse_result_row)?
        .collect::<rusqlite::Result<_>>()?;

    Ok(())
}

fn query_matches<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Match>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt
        .query_map(params, parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for m in rows.iter_mut() {
        load_details(conn, m)?;
    }

    Ok(rows)
}

pub fn find_by_id(conn: &Connection, id: MatchId) -> Result<Option<Match>> {
    let sql = format!("SELECT {} FROM matches m WHERE m.id = ?1", MATCH_COLUMNS);

    let found = conn
        .query_row(&sql, params![id], parse_match_row)
        .optional()
        .context("Failed to query match by id")?;

    match found {
        Some(mut m) => {
            load_details(conn, &mut m)?;
            Ok(Some(m))
        }
        None => Ok(None),
    }
}

/// Sub matches owned by a master, in creation order
pub fn list_subs(conn: &Connection, master_id: MatchId) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {} FROM matches m JOIN match_links l ON l.sub_id = m.id \
         WHERE l.master_id = ?1 ORDER BY m.id",
        MATCH_COLUMNS
    );
    query_matches(conn, &sql, params![master_id])
        .with_context(|| format!("Failed to list sub matches of {}", master_id))
}

pub fn update_state(conn: &Connection, id: MatchId, state: MatchState) -> Result<()> {
    conn.execute("UPDATE matches SET state = ?1 WHERE id = ?2", params![state.as_str(), id])
        .with_context(|| format!("Failed to update state of match {}", id))
        .map(|_| ())
}

/// Returns false when the player was already on the roster.
pub fn add_player(conn: &Connection, match_id: MatchId, player_id: PlayerId) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO match_players (match_id, player_id) VALUES (?1, ?2)",
            params![match_id, player_id],
        )
        .context("Failed to add player to match")?;
    Ok(inserted > 0)
}

pub fn insert_results(conn: &Connection, match_id: MatchId, results: &[MatchResult]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO match_results (match_id, player_id, position, placement) \
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for (position, result) in results.iter().enumerate() {
        stmt.execute(params![
            match_id,
            result.player_id,
            position as i64,
            i64::from(result.placement)
        ])
        .with_context(|| {
            format!("Failed to store result of player {} in match {}", result.player_id, match_id)
        })?;
    }

    Ok(())
}

/// Finished sub matches in which the player has a result entry
pub fn list_finished_with_player(conn: &Connection, player_id: PlayerId) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {} FROM matches m \
         WHERE m.kind = 'sub' AND m.state = 'finished' \
         AND EXISTS (SELECT 1 FROM match_results r WHERE r.match_id = m.id AND r.player_id = ?1) \
         ORDER BY m.id",
        MATCH_COLUMNS
    );
    query_matches(conn, &sql, params![player_id])
        .with_context(|| format!("Failed to list finished matches of player {}", player_id))
}

/// Finished sub matches linked to a tournament
pub fn list_finished_subs_for_tournament(
    conn: &Connection,
    tournament_id: TournamentId,
) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {} FROM matches m JOIN tournament_matches tm ON tm.match_id = m.id \
         WHERE tm.tournament_id = ?1 AND m.kind = 'sub' AND m.state = 'finished' \
         ORDER BY m.id",
        MATCH_COLUMNS
    );
    query_matches(conn, &sql, params![tournament_id]).with_context(|| {
        format!("Failed to list finished matches of tournament {}", tournament_id)
    })
}

/// Every match linked to a tournament, masters and subs, in creation order
pub fn list_for_tournament(conn: &Connection, tournament_id: TournamentId) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {} FROM matches m JOIN tournament_matches tm ON tm.match_id = m.id \
         WHERE tm.tournament_id = ?1 ORDER BY m.id",
        MATCH_COLUMNS
    );
    query_matches(conn, &sql, params![tournament_id])
        .with_context(|| format!("Failed to list matches of tournament {}", tournament_id))
}

pub fn delete_match(conn: &Connection, id: MatchId) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM matches WHERE id = ?1", params![id])
        .with_context(|| format!("Failed to delete match {}", id))?;
    Ok(deleted > 0)
}
