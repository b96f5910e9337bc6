use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct KvEntryRow {
    pub key: String,
    pub value: String,
    pub revision: i64,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for KvEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            revision: row.get("revision")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct KvRepository;

impl KvRepository {
    pub fn get(conn: &Connection, key: &str) -> AppResult<Option<KvEntryRow>> {
        let mut stmt = conn
            .prepare("SELECT key, value, revision, updated_at FROM kv_store WHERE key = ?1")?;

        let row = stmt
            .query_row([key], |row| KvEntryRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn put(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO kv_store (key, value, revision)
                VALUES (:key, :value, 1)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    revision = kv_store.revision + 1,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            named_params! {":key": key, ":value": value},
        )?;

        Ok(())
    }

    /// Reads the current value, computes the next one and writes it back inside a
    /// single `BEGIN IMMEDIATE` transaction. If `apply` fails nothing is written.
    pub fn update<F>(conn: &mut Connection, key: &str, apply: F) -> AppResult<KvEntryRow>
    where
        F: FnOnce(Option<&str>) -> AppResult<String>,
    {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::get(&tx, key)?;
        let next = apply(current.as_ref().map(|row| row.value.as_str()))?;
        Self::put(&tx, key, &next)?;
        let stored = Self::get(&tx, key)?.ok_or_else(AppError::not_found)?;

        tx.commit()?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(include_str!("../schema.sql"))
            .expect("schema");
        migrations::run(&conn).expect("migrations");
        conn
    }

    #[test]
    fn put_increments_revision() {
        let conn = connection();
        KvRepository::put(&conn, "analyses", "[]").expect("first put");
        KvRepository::put(&conn, "analyses", "[1]").expect("second put");

        let row = KvRepository::get(&conn, "analyses")
            .expect("get")
            .expect("row exists");
        assert_eq!(row.value, "[1]");
        assert_eq!(row.revision, 2);
    }

    #[test]
    fn failed_update_leaves_value_untouched() {
        let mut conn = connection();
        KvRepository::put(&conn, "analyses", "[]").expect("seed");

        let result = KvRepository::update(&mut conn, "analyses", |_| {
            Err(AppError::other("serializer exploded"))
        });
        assert!(result.is_err());

        let row = KvRepository::get(&conn, "analyses")
            .expect("get")
            .expect("row exists");
        assert_eq!(row.value, "[]");
        assert_eq!(row.revision, 1);
    }

    #[test]
    fn update_sees_previous_value() {
        let mut conn = connection();
        KvRepository::update(&mut conn, "counter", |current| {
            assert!(current.is_none());
            Ok("1".to_string())
        })
        .expect("first update");

        let row = KvRepository::update(&mut conn, "counter", |current| {
            let value: i64 = current.unwrap_or("0").parse().unwrap_or(0);
            Ok((value + 1).to_string())
        })
        .expect("second update");

        assert_eq!(row.value, "2");
        assert_eq!(row.revision, 2);
    }
}
