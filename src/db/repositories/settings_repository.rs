use std::collections::BTreeMap;

use rusqlite::{named_params, Connection};

use crate::error::AppResult;

/// One pending change to a stored override: `Some` sets it, `None` removes it.
pub type OverrideChange<'a> = (&'a str, Option<&'a str>);

/// User overrides of the environment configuration, one row per key.
pub struct SettingsRepository;

impl SettingsRepository {
    pub fn load_overrides(conn: &Connection) -> AppResult<BTreeMap<String, String>> {
        let mut stmt = conn.prepare("SELECT key, value FROM app_settings")?;
        let overrides = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(overrides)
    }

    /// Applies every change or none of them.
    pub fn apply_changes(conn: &mut Connection, changes: &[OverrideChange<'_>]) -> AppResult<()> {
        let tx = conn.transaction()?;
        for (key, value) in changes {
            match value {
                Some(value) => {
                    tx.execute(
                        r#"
                            INSERT INTO app_settings (key, value)
                            VALUES (:key, :value)
                            ON CONFLICT(key) DO UPDATE SET
                                value = excluded.value,
                                updated_at = CURRENT_TIMESTAMP
                        "#,
                        named_params! {":key": key, ":value": value},
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
