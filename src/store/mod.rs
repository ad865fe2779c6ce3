pub mod memory;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::MemoryCollection;

static QUOTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']"#).unwrap());

/// Field remapping used when a note changes type: source field index →
/// target field index, or `None` to discard the content.
pub type FieldRemap = BTreeMap<usize, Option<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Standard,
    Cloze,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub name: String,
    pub qfmt: String,
    pub afmt: String,
}

/// A note type as the collection stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteModel {
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
    pub sort_field: usize,
    pub kind: ModelKind,
}

impl NoteModel {
    pub fn new(name: &str) -> Self {
        NoteModel {
            name: name.to_string(),
            fields: Vec::new(),
            templates: Vec::new(),
            css: String::new(),
            sort_field: 0,
            kind: ModelKind::Standard,
        }
    }

    pub fn add_field(&mut self, name: &str) {
        self.fields.push(name.to_string());
    }

    pub fn add_template(&mut self, template: CardTemplate) {
        self.templates.push(template);
    }

    pub fn set_css(&mut self, css: String) {
        self.css = css;
    }

    pub fn set_sort_field(&mut self, idx: usize) {
        self.sort_field = idx;
    }

    pub fn mark_cloze(&mut self) {
        self.kind = ModelKind::Cloze;
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// A note as it lives in the collection. `note_id` is 0 until the note is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub note_id: i64,
    pub model: String,
    pub field_names: Vec<String>,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
    pub deck: String,
}

impl StoredNote {
    /// A blank note of the given type, one empty value per field.
    pub fn new(model: &NoteModel, deck: &str) -> Self {
        StoredNote {
            note_id: 0,
            model: model.name.clone(),
            field_names: model.fields.clone(),
            fields: vec![String::new(); model.fields.len()],
            tags: Vec::new(),
            deck: deck.to_string(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let idx = self.field_names.iter().position(|f| f == name)?;
        self.fields.get(idx).map(String::as_str)
    }

    /// Set a field by name. Returns false if the note type has no such field.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        match self.field_names.iter().position(|f| f == name) {
            Some(idx) => {
                self.fields[idx] = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Switch this note to `to`, carrying values across according to `remap`.
    /// Target fields nothing maps onto come out empty.
    pub fn change_model(&mut self, to: &NoteModel, remap: &FieldRemap) {
        let mut fields = vec![String::new(); to.fields.len()];
        for (src, dst) in remap {
            if let (Some(dst), Some(value)) = (dst, self.fields.get(*src)) {
                if let Some(slot) = fields.get_mut(*dst) {
                    *slot = value.clone();
                }
            }
        }
        self.model = to.name.clone();
        self.field_names = to.fields.clone();
        self.fields = fields;
    }
}

/// The flashcard collection the sync writes into.
pub trait Collection {
    fn model_by_name(&self, name: &str) -> Result<Option<NoteModel>>;

    fn add_model(&mut self, model: NoteModel) -> Result<()>;

    /// The collection's own tag normalization. May return empty strings.
    fn canonify_tags(&self, tags: Vec<String>) -> Result<Vec<String>>;

    fn notes(&self) -> Result<Vec<StoredNote>>;

    /// Persist a new note and assign its `note_id`.
    fn add_note(&mut self, note: &mut StoredNote) -> Result<()>;

    fn save_note(&mut self, note: &StoredNote) -> Result<()>;

    fn remove_notes(&mut self, note_ids: &[i64]) -> Result<()>;
}

/// Strip quote characters, adopt the casing of matching known tags, then
/// dedupe and sort. Case variants within one call collapse onto the first
/// one seen. A tag made only of quotes comes back as "".
pub fn canonify(tags: Vec<String>, known: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        let stripped = QUOTES_RE.replace_all(&tag, "").to_string();
        let lower = stripped.to_lowercase();
        if seen.iter().any(|t| t.to_lowercase() == lower) {
            continue;
        }
        let tag = match known.iter().find(|k| k.to_lowercase() == lower) {
            Some(k) => k.clone(),
            None => stripped,
        };
        seen.push(tag);
    }
    let out: BTreeSet<String> = seen.into_iter().collect();
    out.into_iter().collect()
}
