use std::collections::BTreeMap;

use super::{canonify, Collection, NoteModel, StoredNote};
use crate::error::{Error, Result};

/// In-process collection. Backs tests and anything that wants to diff
/// without touching the database.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    models: Vec<NoteModel>,
    notes: BTreeMap<i64, StoredNote>,
    tags: Vec<String>,
    next_id: i64,
    /// Number of successful `add_model` calls.
    pub models_added: usize,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[NoteModel] {
        &self.models
    }

    pub fn note(&self, note_id: i64) -> Option<&StoredNote> {
        self.notes.get(&note_id)
    }

    fn register_tags(&mut self, tags: &[String]) {
        for tag in tags {
            if !self.tags.iter().any(|t| t.to_lowercase() == tag.to_lowercase()) {
                self.tags.push(tag.clone());
            }
        }
    }
}

impl Collection for MemoryCollection {
    fn model_by_name(&self, name: &str) -> Result<Option<NoteModel>> {
        Ok(self.models.iter().find(|m| m.name == name).cloned())
    }

    fn add_model(&mut self, model: NoteModel) -> Result<()> {
        self.models.push(model);
        self.models_added += 1;
        Ok(())
    }

    fn canonify_tags(&self, tags: Vec<String>) -> Result<Vec<String>> {
        Ok(canonify(tags, &self.tags))
    }

    fn notes(&self) -> Result<Vec<StoredNote>> {
        Ok(self.notes.values().cloned().collect())
    }

    fn add_note(&mut self, note: &mut StoredNote) -> Result<()> {
        if self.model_by_name(&note.model)?.is_none() {
            return Err(Error::UnknownModel(note.model.clone()));
        }
        self.next_id += 1;
        note.note_id = self.next_id;
        self.register_tags(&note.tags);
        self.notes.insert(note.note_id, note.clone());
        Ok(())
    }

    fn save_note(&mut self, note: &StoredNote) -> Result<()> {
        self.register_tags(&note.tags);
        self.notes.insert(note.note_id, note.clone());
        Ok(())
    }

    fn remove_notes(&mut self, note_ids: &[i64]) -> Result<()> {
        for id in note_ids {
            self.notes.remove(id);
        }
        Ok(())
    }
}
