use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::tiers;
use crate::domain::{LeaderboardEntry, Player, PlayerId};

const PLAYER_COLUMNS: &str = "id, username, points, last_rated";

pub fn insert_player(conn: &Connection, username: &str) -> Result<Player> {
    let sql = format!("INSERT INTO players (username) VALUES (?1) RETURNING {}", PLAYER_COLUMNS);

    conn.query_row(&sql, params![username], parse_player_row)
        .with_context(|| format!("Failed to insert player {}", username))
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        username: row.get(1)?,
        points: row.get(2)?,
        last_rated: row.get(3)?,
        tiers: Vec::new(),
    })
}

pub fn find_by_id(conn: &Connection, id: PlayerId) -> Result<Option<Player>> {
    let sql = format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS);

    let player = conn
        .query_row(&sql, params![id], parse_player_row)
        .optional()
        .context("Failed to query player by id")?;

    match player {
        Some(mut player) => {
            player.tiers = tiers::list_for_player(conn, player.id)?;
            Ok(Some(player))
        }
        None => Ok(None),
    }
}

pub fn exists(conn: &Connection, id: PlayerId) -> Result<bool> {
    let sql = "SELECT EXISTS(SELECT 1 FROM players WHERE id = ?1)";

    conn.query_row(sql, params![id], |row| row.get::<_, bool>(0))
        .context("Failed to check player existence")
}

pub fn list_ids(conn: &Connection) -> Result<Vec<PlayerId>> {
    let mut stmt = conn.prepare("SELECT id FROM players ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, PlayerId>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn update_rating(
    conn: &Connection,
    id: PlayerId,
    points: i64,
    last_rated: NaiveDate,
) -> Result<()> {
    let sql = "UPDATE players SET points = ?1, last_rated = ?2 WHERE id = ?3";

    conn.execute(sql, params![points, last_rated, id])
        .with_context(|| format!("Failed to update rating for player {}", id))
        .map(|_| ())
}

/// Highest points first; equal points fall back to ascending id.
pub fn list_leaderboard(conn: &Connection, limit: usize) -> Result<Vec<LeaderboardEntry>> {
    let sql = "SELECT id, username, points FROM players ORDER BY points DESC, id ASC LIMIT ?1";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(LeaderboardEntry {
                player_id: row.get(0)?,
                username: row.get(1)?,
                points: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
