use std::path::Path;

use rusqlite::{params, Connection, Transaction};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info, instrument};

use super::{InsertSummary, RowStore};
use crate::{error::Result, row::DepthRow};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS depth_rows (
        depth REAL PRIMARY KEY NOT NULL,
        data TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// `depth_rows` table in a single SQLite connection.
///
/// `depth` is the primary key, so range queries walk its index instead of
/// scanning the table. `data` holds the 150 values as a JSON array.
#[derive(Debug)]
pub struct SqliteRowStore {
    conn: Connection,
}

impl SqliteRowStore {
    #[instrument(skip_all, fields(db_path = ?db_path.as_ref()), err)]
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<SqliteRowStore> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<SqliteRowStore> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<SqliteRowStore> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteRowStore { conn })
    }
}

impl RowStore for SqliteRowStore {
    #[instrument(skip_all, fields(nrows = rows.len()), err)]
    fn insert_many(&mut self, rows: &[DepthRow]) -> Result<InsertSummary> {
        let tx = self.conn.transaction()?;
        let summary = write_rows(&tx, rows)?;
        tx.commit()?;
        info!(inserted = summary.inserted, updated = summary.updated);
        Ok(summary)
    }

    #[instrument(skip_all, fields(nrows = rows.len()), err)]
    fn replace_all(&mut self, rows: &[DepthRow]) -> Result<InsertSummary> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM depth_rows", [])?;
        let summary = write_rows(&tx, rows)?;
        tx.commit()?;
        info!(removed, inserted = summary.inserted, updated = summary.updated);
        Ok(summary)
    }

    #[instrument(skip(self), err)]
    fn find_by_depth_range(&self, min: f64, max: f64) -> Result<Vec<DepthRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT depth, data FROM depth_rows WHERE depth >= ?1 AND depth <= ?2 ORDER BY depth",
        )?;
        let raw = stmt
            .query_map(params![min, max], |row| {
                Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let rows = raw
            .into_iter()
            .map(|(depth, data)| DepthRow::new(depth, serde_json::from_str(&data)?))
            .collect::<Result<Vec<_>>>()?;
        debug!(nrows = rows.len());
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    fn clear(&mut self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM depth_rows", [])?;
        info!(removed);
        Ok(removed)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM depth_rows", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Update first, insert when no row carries that depth yet.
fn write_rows(tx: &Transaction, rows: &[DepthRow]) -> Result<InsertSummary> {
    let updated_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut update =
        tx.prepare_cached("UPDATE depth_rows SET data = ?1, updated_at = ?2 WHERE depth = ?3")?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO depth_rows (depth, data, updated_at) VALUES (?1, ?2, ?3)",
    )?;

    let mut summary = InsertSummary::default();
    for row in rows {
        let data = serde_json::to_string(row.data())?;
        if update.execute(params![data, updated_at, row.depth()])? > 0 {
            summary.updated += 1;
        } else {
            insert.execute(params![row.depth(), data, updated_at])?;
            summary.inserted += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, row::FRAME_WIDTH};

    fn row(depth: f64, fill: f64) -> DepthRow {
        DepthRow::new(depth, vec![fill; FRAME_WIDTH]).unwrap()
    }

    fn depths(rows: &[DepthRow]) -> Vec<f64> {
        rows.iter().map(|r| r.depth()).collect()
    }

    #[test]
    fn test_brand_new_store() {
        let store = SqliteRowStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.find_by_depth_range(-1e6, 1e6).unwrap().is_empty());
    }

    #[test]
    fn test_range_is_inclusive_and_sorted() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        let summary = store
            .insert_many(&[row(300.0, 3.0), row(100.0, 1.0), row(200.0, 2.0), row(400.0, 4.0)])
            .unwrap();
        assert_eq!(summary, InsertSummary { inserted: 4, updated: 0 });

        let rows = store.find_by_depth_range(100.0, 300.0).unwrap();
        assert_eq!(depths(&rows), [100.0, 200.0, 300.0]);
        assert_eq!(rows[1], row(200.0, 2.0));

        assert!(store.find_by_depth_range(150.0, 150.0).unwrap().is_empty());
        assert_eq!(depths(&store.find_by_depth_range(400.0, 400.0).unwrap()), [400.0]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        let batch = [row(1.5, 0.25), row(2.5, 0.5)];
        store.insert_many(&batch).unwrap();
        let summary = store.insert_many(&batch).unwrap();
        assert_eq!(summary, InsertSummary { inserted: 0, updated: 2 });
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.find_by_depth_range(0.0, 10.0).unwrap(), batch);
        let stamped: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM depth_rows WHERE updated_at LIKE '____-__-__T%'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(stamped, 2);

        store.insert_many(&[row(1.5, 9.0)]).unwrap();
        assert_eq!(store.find_by_depth_range(1.5, 1.5).unwrap(), [row(1.5, 9.0)]);
    }

    #[test]
    fn test_values_survive_round_trip() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        let data: Vec<_> = (0..FRAME_WIDTH).map(|i| i as f64 / 3.0 - 1e-7).collect();
        let original = DepthRow::new(-12.75, data).unwrap();
        store.insert_many(std::slice::from_ref(&original)).unwrap();
        assert_eq!(store.find_by_depth_range(-13.0, -12.0).unwrap(), [original]);
    }

    #[test]
    fn test_replace_all() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store.insert_many(&[row(1.0, 1.0), row(2.0, 2.0)]).unwrap();
        let summary = store.replace_all(&[row(2.0, 5.0), row(3.0, 3.0)]).unwrap();
        assert_eq!(summary, InsertSummary { inserted: 2, updated: 0 });
        assert_eq!(
            store.find_by_depth_range(0.0, 10.0).unwrap(),
            [row(2.0, 5.0), row(3.0, 3.0)]
        );
    }

    #[test]
    fn test_clear() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store.insert_many(&[row(1.0, 1.0), row(2.0, 2.0)]).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_payload() {
        let store = SqliteRowStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO depth_rows (depth, data, updated_at) VALUES (5.0, '[1.0, 2.0]', '')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.find_by_depth_range(0.0, 10.0),
            Err(Error::CorruptRow { len: 2, .. })
        ));
    }
}
