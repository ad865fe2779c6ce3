use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::{canonify, Collection, NoteModel, StoredNote};

pub const DEFAULT_DB_PATH: &str = "data/remember.sqlite";

/// The flashcard collection on disk.
pub struct SqliteCollection {
    conn: Connection,
}

impl SqliteCollection {
    /// Open (creating if needed) the database at `path`, including any
    /// missing parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(SqliteCollection { conn })
    }

    /// Every known note type with how many notes use it, by name.
    pub fn note_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.name, COUNT(n.id)
             FROM models m
             LEFT JOIN notes n ON n.model = m.name
             GROUP BY m.name
             ORDER BY m.name",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn known_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM tags ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS models (
            name        TEXT PRIMARY KEY,
            fields      TEXT NOT NULL,
            definition  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS notes (
            id          INTEGER PRIMARY KEY,
            model       TEXT NOT NULL REFERENCES models(name),
            fields      TEXT NOT NULL,
            tags        TEXT NOT NULL,
            deck        TEXT NOT NULL,
            modified_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_notes_model ON notes(model);

        -- Tags in first-seen casing; lookups ignore case.
        CREATE TABLE IF NOT EXISTS tags (
            name        TEXT PRIMARY KEY COLLATE NOCASE
        );
        ",
    )?;
    Ok(())
}

fn register_tags(conn: &Connection, tags: &[String]) -> Result<()> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?;
    for tag in tags {
        stmt.execute([tag])?;
    }
    Ok(())
}

// ── Collection ──

impl Collection for SqliteCollection {
    fn model_by_name(&self, name: &str) -> Result<Option<NoteModel>> {
        let definition: Option<String> = self
            .conn
            .query_row("SELECT definition FROM models WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        match definition {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn add_model(&mut self, model: NoteModel) -> Result<()> {
        self.conn.execute(
            "INSERT INTO models (name, fields, definition) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                model.name,
                serde_json::to_string(&model.fields)?,
                serde_json::to_string(&model)?,
            ],
        )?;
        Ok(())
    }

    fn canonify_tags(&self, tags: Vec<String>) -> Result<Vec<String>> {
        Ok(canonify(tags, &self.known_tags()?))
    }

    fn notes(&self) -> Result<Vec<StoredNote>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.model, m.fields, n.fields, n.tags, n.deck
             FROM notes n
             JOIN models m ON m.name = n.model
             ORDER BY n.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(note_id, model, field_names, fields, tags, deck)| {
                Ok(StoredNote {
                    note_id,
                    model,
                    field_names: serde_json::from_str(&field_names)?,
                    fields: serde_json::from_str(&fields)?,
                    tags: serde_json::from_str(&tags)?,
                    deck,
                })
            })
            .collect()
    }

    fn add_note(&mut self, note: &mut StoredNote) -> Result<()> {
        if self.model_by_name(&note.model)?.is_none() {
            return Err(Error::UnknownModel(note.model.clone()));
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO notes (model, fields, tags, deck) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                note.model,
                serde_json::to_string(&note.fields)?,
                serde_json::to_string(&note.tags)?,
                note.deck,
            ],
        )?;
        note.note_id = tx.last_insert_rowid();
        register_tags(&tx, &note.tags)?;
        tx.commit()?;
        debug!("Stored note {} ({})", note.note_id, note.model);
        Ok(())
    }

    fn save_note(&mut self, note: &StoredNote) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE notes
             SET model = ?2, fields = ?3, tags = ?4, deck = ?5, modified_at = datetime('now')
             WHERE id = ?1",
            rusqlite::params![
                note.note_id,
                note.model,
                serde_json::to_string(&note.fields)?,
                serde_json::to_string(&note.tags)?,
                note.deck,
            ],
        )?;
        register_tags(&tx, &note.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_notes(&mut self, note_ids: &[i64]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM notes WHERE id = ?1")?;
            for id in note_ids {
                stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ensure_note_types, CLOZE, QUESTION_ANSWER};

    fn collection() -> SqliteCollection {
        let mut col = SqliteCollection::open_in_memory().unwrap();
        ensure_note_types(&mut col).unwrap();
        col
    }

    #[test]
    fn models_round_trip() {
        let col = collection();
        let model = col.model_by_name(QUESTION_ANSWER.name).unwrap().unwrap();
        assert_eq!(model, QUESTION_ANSWER.to_model());
        assert!(col.model_by_name("Basic").unwrap().is_none());
    }

    #[test]
    fn ensure_twice_adds_nothing() {
        let mut col = collection();
        assert_eq!(ensure_note_types(&mut col).unwrap(), 0);
        assert_eq!(col.note_counts().unwrap().len(), 2);
    }

    #[test]
    fn add_save_remove() {
        let mut col = collection();
        let model = col.model_by_name(CLOZE.name).unwrap().unwrap();

        let mut note = StoredNote::new(&model, "Default");
        note.set_field("Text", "{{c1::x}}");
        note.tags = vec!["Geo".into()];
        col.add_note(&mut note).unwrap();
        assert!(note.note_id > 0);

        note.deck = "Elsewhere".into();
        note.set_field("ID", "C1");
        col.save_note(&note).unwrap();

        let stored = col.notes().unwrap();
        assert_eq!(stored, vec![note.clone()]);

        col.remove_notes(&[note.note_id]).unwrap();
        assert!(col.notes().unwrap().is_empty());
    }

    #[test]
    fn unknown_model_rejected() {
        let mut col = collection();
        let mut note = StoredNote::new(&NoteModel::new("Ghost"), "Default");
        assert!(matches!(col.add_note(&mut note), Err(Error::UnknownModel(_))));
    }

    #[test]
    fn canonify_uses_stored_tags() {
        let mut col = collection();
        let model = col.model_by_name(QUESTION_ANSWER.name).unwrap().unwrap();
        let mut note = StoredNote::new(&model, "Default");
        note.tags = vec!["Chemistry".into()];
        col.add_note(&mut note).unwrap();

        let tags = col.canonify_tags(vec!["chemistry".into(), "'new'".into()]).unwrap();
        assert_eq!(tags, vec!["Chemistry", "new"]);
    }

    #[test]
    fn counts_per_model() {
        let mut col = collection();
        let model = col.model_by_name(CLOZE.name).unwrap().unwrap();
        for _ in 0..3 {
            col.add_note(&mut StoredNote::new(&model, "Default")).unwrap();
        }
        let counts = col.note_counts().unwrap();
        assert_eq!(
            counts,
            vec![(CLOZE.name.to_string(), 3), (QUESTION_ANSWER.name.to_string(), 0)]
        );
    }

    #[test]
    fn open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/remember.sqlite");
        let mut col = SqliteCollection::open(&path).unwrap();
        ensure_note_types(&mut col).unwrap();
        drop(col);

        let col = SqliteCollection::open(&path).unwrap();
        assert!(col.model_by_name(CLOZE.name).unwrap().is_some());
    }
}
