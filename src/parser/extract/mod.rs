pub mod cloze;
pub mod question;

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::ModelData;
use crate::note::{TwNote, Twid};
use crate::parser::html::{Document, Element, Selector};

const DECK_LIST: Selector = Selector::tag_id("ul", "anki-decks");
const TAG_LIST: Selector = Selector::tag_id("ul", "anki-tags");
const LIST_ITEM: Selector = Selector::tag("li");
pub(crate) const NOTE_ID: Selector = Selector::tag_class("div", "rid");

/// Every kind of note a tiddler can contain. Adding a kind means a new
/// variant here and an entry in `NOTE_TYPES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteType {
    Question,
    Cloze,
}

pub const NOTE_TYPES: [NoteType; 2] = [NoteType::Question, NoteType::Cloze];

impl NoteType {
    /// Cheap check for this kind's marker before doing a full parse.
    pub fn wants_document(self, doc: &Document) -> bool {
        match self {
            NoteType::Question => question::wants_document(doc),
            NoteType::Cloze => cloze::wants_document(doc),
        }
    }

    pub fn parse_html(self, doc: &Document, name: &str) -> Result<Vec<TwNote>> {
        match self {
            NoteType::Question => question::parse_html(doc, name),
            NoteType::Cloze => cloze::parse_html(doc, name),
        }
    }

    pub fn model(self) -> &'static ModelData {
        match self {
            NoteType::Question => &crate::models::QUESTION_ANSWER,
            NoteType::Cloze => &crate::models::CLOZE,
        }
    }
}

/// The deck and tags a tiddler's notes should land in, from the
/// `anki-decks` and `anki-tags` lists.
pub fn deck_and_tags(doc: &Document) -> (Option<String>, BTreeSet<String>) {
    let deck = doc
        .find(&DECK_LIST)
        .and_then(|ul| ul.find(&LIST_ITEM))
        .map(|li| li.text());

    let tags = doc
        .find(&TAG_LIST)
        .map(|ul| ul.find_all(&LIST_ITEM).map(|li| li.text()).collect())
        .unwrap_or_default();

    (deck, tags)
}

/// Strip surrounding whitespace, then one `[` and one `]`.
pub fn parse_twid(raw: &str) -> Twid {
    let id = raw.trim();
    let id = id.strip_prefix('[').unwrap_or(id);
    id.strip_suffix(']').unwrap_or(id).to_string()
}

/// A sub-element every note of a kind must have; its absence fails the tiddler.
pub(crate) fn require<'a>(el: Option<Element<'a>>, document: &str, missing: &str) -> Result<Element<'a>> {
    el.ok_or_else(|| Error::MalformedFragment {
        document: document.to_string(),
        missing: missing.to_string(),
    })
}
