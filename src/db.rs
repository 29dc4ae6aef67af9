use std::path::Path;

use rusqlite::{Connection, ToSql};

use crate::error::Result;
use crate::parser::AnimalRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// `table` must already be a validated identifier; it is spliced into SQL.
pub fn init_schema(conn: &Connection, table: &str) -> Result<()> {
    let columns: Vec<String> = AnimalRecord::COLUMNS
        .iter()
        .map(|c| format!("    {c} TEXT"))
        .collect();
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {table} (
            row_id     INTEGER PRIMARY KEY,
        {},
            scraped_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_id ON {table}(id);
        ",
        columns.join(",\n        ")
    ))?;
    Ok(())
}

// ── Writing ──

/// Append every record in one transaction. Columns are named, so the
/// table's physical column order does not matter. Existing rows are
/// never touched, and repeats are stored again.
pub fn append_records(conn: &Connection, table: &str, records: &[AnimalRecord]) -> Result<usize> {
    let placeholders: Vec<String> = (1..=AnimalRecord::COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        AnimalRecord::COLUMNS.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for r in records {
            let values = r.values();
            let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
            count += stmt.execute(params.as_slice())?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub distinct_ids: usize,
    pub by_breed: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection, table: &str) -> Result<Stats> {
    let total: usize = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    let distinct_ids: usize = conn.query_row(
        &format!("SELECT COUNT(DISTINCT id) FROM {table}"),
        [],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "SELECT COALESCE(breed, ''), COUNT(*) FROM {table} GROUP BY breed ORDER BY COUNT(*) DESC, breed"
    ))?;
    let by_breed = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Stats {
        total,
        distinct_ids,
        by_breed,
    })
}
