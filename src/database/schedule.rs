use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

pub fn load_next_due(conn: &Connection) -> Result<Option<NaiveDateTime>> {
    conn.query_row("SELECT next_due FROM maintenance_schedule WHERE id = 1", [], |row| {
        row.get::<_, NaiveDateTime>(0)
    })
    .optional()
    .context("Failed to load maintenance schedule")
}

pub fn store_next_due(conn: &Connection, next_due: NaiveDateTime) -> Result<()> {
    let sql = "INSERT INTO maintenance_schedule (id, next_due) VALUES (1, ?1) \
               ON CONFLICT(id) DO UPDATE SET next_due = excluded.next_due";

    conn.execute(sql, params![next_due])
        .context("Failed to store maintenance schedule")
        .map(|_| ())
}
