//! SQLite state database
//!
//! Tracks imported learning apps, their units, and an append-only history of
//! imports, edits and removals.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use lpk_schema::{LearningApp, LearningUnit, PackageId, UnitId};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode column: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    InvalidRecord(String),

    #[error("Unknown learning app: {0}")]
    UnknownApp(String),

    #[error("Database actor stopped")]
    ActorDied,
}

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub package: String,
    /// `import`, `edit`, `unit-add` or `remove`.
    pub action: String,
    pub detail: String,
}

/// State database for imported learning apps
#[derive(Debug)]
pub struct StateDb {
    conn: Connection,
}

impl StateDb {
    /// Open or create the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while an import commits
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Throwaway database for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS learning_apps (
                package TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                launch_activity TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_units (
                package TEXT NOT NULL REFERENCES learning_apps(package) ON DELETE CASCADE,
                unit_id TEXT NOT NULL,
                icon TEXT NOT NULL,
                additional_assets TEXT NOT NULL,
                fields TEXT NOT NULL,
                tags TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (package, unit_id)
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package TEXT NOT NULL,
                action TEXT NOT NULL,
                detail TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_package ON history(package);
            ",
        )?;
        Ok(())
    }

    /// All apps, ordered by package identifier.
    pub fn list_apps(&self) -> Result<Vec<LearningApp>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT package, name, launch_activity FROM learning_apps ORDER BY package")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        rows.map(|row| {
            let (package, name, activity) = row?;
            app_from_row(&package, name, activity)
        })
        .collect()
    }

    pub fn find_app(&self, package: &str) -> Result<Option<LearningApp>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT package, name, launch_activity FROM learning_apps WHERE package = ?1",
                params![package],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(package, name, activity)| app_from_row(&package, name, activity))
            .transpose()
    }

    /// Insert or update an app record. Existing units are left alone.
    pub fn upsert_app(&self, app: &LearningApp) -> Result<(), DbError> {
        // ON CONFLICT instead of INSERT OR REPLACE: a replace is a delete and
        // would cascade to the unit table.
        self.conn.execute(
            "INSERT INTO learning_apps (package, name, launch_activity, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(package) DO UPDATE SET
                name = excluded.name,
                launch_activity = excluded.launch_activity,
                updated_at = excluded.updated_at",
            params![
                app.package.as_str(),
                app.display_name,
                app.launch_activity,
                now_millis()
            ],
        )?;
        Ok(())
    }

    /// Delete an app and, through the foreign key, its units.
    pub fn delete_app(&self, package: &str) -> Result<bool, DbError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM learning_units WHERE package = ?1", params![package])?;
        let deleted = tx.execute("DELETE FROM learning_apps WHERE package = ?1", params![package])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Units of `package` in catalog order.
    pub fn units(&self, package: &str) -> Result<Vec<LearningUnit>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT package, unit_id, icon, additional_assets, fields, tags
             FROM learning_units WHERE package = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![package], |row| {
            Ok(UnitRow {
                package: row.get(0)?,
                unit_id: row.get(1)?,
                icon: row.get(2)?,
                additional_assets: row.get(3)?,
                fields: row.get(4)?,
                tags: row.get(5)?,
            })
        })?;

        rows.map(|row| row?.into_unit()).collect()
    }

    /// Replace the full unit set of an existing app.
    pub fn replace_units(&self, package: &str, units: &[LearningUnit]) -> Result<(), DbError> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM learning_apps WHERE package = ?1)",
            params![package],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::UnknownApp(package.to_string()));
        }
        write_units(&tx, package, units)?;
        tx.commit()?;
        Ok(())
    }

    /// Upsert `app` and replace its unit set in a single transaction.
    pub fn commit_import(&self, app: &LearningApp, units: &[LearningUnit]) -> Result<(), DbError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO learning_apps (package, name, launch_activity, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(package) DO UPDATE SET
                name = excluded.name,
                launch_activity = excluded.launch_activity,
                updated_at = excluded.updated_at",
            params![
                app.package.as_str(),
                app.display_name,
                app.launch_activity,
                now_millis()
            ],
        )?;
        write_units(&tx, app.package.as_str(), units)?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_history(&self, package: &str, action: &str, detail: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO history (package, action, detail, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![package, action, detail, now_millis()],
        )?;
        Ok(())
    }

    /// History of `package`, oldest first.
    pub fn history(&self, package: &str) -> Result<Vec<HistoryEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, package, action, detail FROM history
             WHERE package = ?1 ORDER BY id",
        )?;

        let events = stmt.query_map(params![package], |row| {
            Ok(HistoryEvent {
                timestamp: row.get(0)?,
                package: row.get(1)?,
                action: row.get(2)?,
                detail: row.get(3)?,
            })
        })?;

        events.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

struct UnitRow {
    package: String,
    unit_id: String,
    icon: String,
    additional_assets: String,
    fields: String,
    tags: String,
}

impl UnitRow {
    fn into_unit(self) -> Result<LearningUnit, DbError> {
        let package = parse_package(&self.package)?;
        let assets: Vec<String> = serde_json::from_str(&self.additional_assets)?;
        let mut unit = LearningUnit::new(package, UnitId::from(self.unit_id), &self.icon, assets);
        unit.fields = serde_json::from_str::<BTreeMap<String, String>>(&self.fields)?;
        unit.tags = serde_json::from_str::<BTreeMap<String, BTreeSet<String>>>(&self.tags)?;
        Ok(unit)
    }
}

fn write_units(conn: &Connection, package: &str, units: &[LearningUnit]) -> Result<(), DbError> {
    conn.execute("DELETE FROM learning_units WHERE package = ?1", params![package])?;

    let mut stmt = conn.prepare(
        "INSERT INTO learning_units
            (package, unit_id, icon, additional_assets, fields, tags, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, unit) in units.iter().enumerate() {
        stmt.execute(params![
            package,
            unit.unit_id.as_str(),
            unit.icon,
            serde_json::to_string(&unit.permitted_assets)?,
            serde_json::to_string(&unit.fields)?,
            serde_json::to_string(&unit.tags)?,
            position as i64,
        ])?;
    }
    Ok(())
}

fn app_from_row(package: &str, name: String, activity: String) -> Result<LearningApp, DbError> {
    Ok(LearningApp {
        display_name: name,
        package: parse_package(package)?,
        launch_activity: activity,
    })
}

fn parse_package(raw: &str) -> Result<PackageId, DbError> {
    PackageId::new(raw).map_err(|e| DbError::InvalidRecord(format!("{raw}: {e}")))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn app(package: &str, name: &str) -> LearningApp {
        LearningApp {
            display_name: name.to_string(),
            package: PackageId::new(package).unwrap(),
            launch_activity: "MainActivity".to_string(),
        }
    }

    fn unit(package: &str, id: &str) -> LearningUnit {
        let mut unit = LearningUnit::new(
            PackageId::new(package).unwrap(),
            UnitId::new(id),
            "icon.png",
            vec!["assets/".to_string()],
        );
        unit.fields.insert("difficulty".to_string(), "easy".to_string());
        unit.tags
            .entry("topic".to_string())
            .or_default()
            .insert("numbers".to_string());
        unit
    }

    #[test]
    fn test_commit_import_and_list() {
        let db = StateDb::open_in_memory().unwrap();
        db.commit_import(
            &app("com.example.unit", "Example"),
            &[unit("com.example.unit", "u1"), unit("com.example.unit", "u2")],
        )
        .unwrap();

        let apps = db.list_apps().unwrap();
        assert_eq!(apps, vec![app("com.example.unit", "Example")]);

        let units = db.units("com.example.unit").unwrap();
        let ids: Vec<&str> = units.iter().map(|u| u.unit_id.as_str()).collect();
        assert_eq!(ids, ["u1", "u2"]);
        assert_eq!(units[0], unit("com.example.unit", "u1"));
    }

    #[test]
    fn test_reimport_replaces_units_wholesale() {
        let db = StateDb::open_in_memory().unwrap();
        let first = app("com.example.unit", "Example");
        db.commit_import(&first, &[unit("com.example.unit", "u1"), unit("com.example.unit", "u2")])
            .unwrap();

        let renamed = app("com.example.unit", "Example 2");
        db.commit_import(&renamed, &[unit("com.example.unit", "u3")]).unwrap();

        let units = db.units("com.example.unit").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_id.as_str(), "u3");
        assert_eq!(db.find_app("com.example.unit").unwrap(), Some(renamed));
    }

    #[test]
    fn test_upsert_keeps_units() {
        let db = StateDb::open_in_memory().unwrap();
        db.commit_import(&app("com.example.unit", "Example"), &[unit("com.example.unit", "u1")])
            .unwrap();
        db.upsert_app(&app("com.example.unit", "Renamed")).unwrap();

        assert_eq!(db.units("com.example.unit").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_cascades_to_units() {
        let db = StateDb::open_in_memory().unwrap();
        db.commit_import(&app("com.example.unit", "Example"), &[unit("com.example.unit", "u1")])
            .unwrap();

        assert!(db.delete_app("com.example.unit").unwrap());
        assert!(!db.delete_app("com.example.unit").unwrap());
        assert!(db.find_app("com.example.unit").unwrap().is_none());
        assert!(db.units("com.example.unit").unwrap().is_empty());
    }

    #[test]
    fn test_replace_units_requires_app() {
        let db = StateDb::open_in_memory().unwrap();
        let err = db
            .replace_units("com.example.unit", &[unit("com.example.unit", "u1")])
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownApp(_)));
    }

    #[test]
    fn test_history_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let db = StateDb::open_at(&path).unwrap();
            db.add_history("com.example.unit", "import", "1 unit").unwrap();
            db.add_history("com.example.unit", "remove", "").unwrap();
        }

        let db = StateDb::open_at(&path).unwrap();
        let events = db.history("com.example.unit").unwrap();
        let actions: Vec<&str> = events.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["import", "remove"]);
        assert!(db.history("com.other.app").unwrap().is_empty());
    }
}
