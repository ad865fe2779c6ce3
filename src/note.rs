use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::models::{ModelData, CLOZE, QUESTION_ANSWER};

/// TiddlyWiki-side note ID, the text of a `rid` element minus its brackets.
pub type Twid = String;

/// The kind-specific content of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteBody {
    Question { question: String, answer: String },
    Cloze { text: String },
}

/// A note found in a tiddler. Identity is the `id` alone: two notes with
/// the same ID are the same note whatever their content.
#[derive(Debug, Clone)]
pub struct TwNote {
    pub id: Twid,
    pub tidref: String,
    pub target_tags: BTreeSet<String>,
    pub target_deck: Option<String>,
    /// Only set by `set_permalink`, never by the parser.
    pub permalink: Option<String>,
    pub body: NoteBody,
}

impl TwNote {
    pub fn question(
        id: Twid,
        tidref: &str,
        question: String,
        answer: String,
        target_tags: BTreeSet<String>,
        target_deck: Option<String>,
    ) -> Self {
        TwNote {
            id,
            tidref: tidref.to_string(),
            target_tags,
            target_deck,
            permalink: None,
            body: NoteBody::Question { question, answer },
        }
    }

    pub fn cloze(
        id: Twid,
        tidref: &str,
        text: String,
        target_tags: BTreeSet<String>,
        target_deck: Option<String>,
    ) -> Self {
        TwNote {
            id,
            tidref: tidref.to_string(),
            target_tags,
            target_deck,
            permalink: None,
            body: NoteBody::Cloze { text },
        }
    }

    /// The note type this note is stored as.
    pub fn model(&self) -> &'static ModelData {
        match self.body {
            NoteBody::Question { .. } => &QUESTION_ANSWER,
            NoteBody::Cloze { .. } => &CLOZE,
        }
    }
}

impl PartialEq for TwNote {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TwNote {}

impl Hash for TwNote {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
