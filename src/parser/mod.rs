pub mod extract;
pub mod html;

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::note::TwNote;
use extract::NOTE_TYPES;
use html::Document;

/// Parse one rendered tiddler and collect every note in it.
pub fn notes_from_tiddler(tiddler: &str, name: &str) -> Result<HashSet<TwNote>> {
    let doc = Document::parse(tiddler).map_err(|source| Error::Html {
        document: name.to_string(),
        source,
    })?;
    notes_from_document(&doc, name)
}

/// Offer the document to each note type; those that want it extract their notes.
pub fn notes_from_document(doc: &Document, name: &str) -> Result<HashSet<TwNote>> {
    let mut notes = HashSet::new();
    for note_type in NOTE_TYPES {
        if note_type.wants_document(doc) {
            let found = note_type.parse_html(doc, name)?;
            debug!("{:?}: {} note(s) in {:?}", note_type, found.len(), name);
            notes.extend(found);
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteBody;

    #[test]
    fn mixed_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/mixed.html").unwrap();
        let notes = notes_from_tiddler(&html, "Mixed Bag").unwrap();
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.tidref == "Mixed Bag"));
        let clozes = notes.iter().filter(|n| matches!(n.body, NoteBody::Cloze { .. })).count();
        assert_eq!(clozes, 1);
        assert!(notes.iter().all(|n| n.target_deck.as_deref() == Some("General")));
    }

    #[test]
    fn no_notes() {
        let notes = notes_from_tiddler("<p>Just prose.</p>", "Prose").unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn duplicate_ids_collapse() {
        let html = r#"<div class="rememberq"><div class="rquestion"><p>a</p></div><div class="ranswer"><p>b</p></div><div class="rid">[X]</div></div>
<div class="rememberq"><div class="rquestion"><p>c</p></div><div class="ranswer"><p>d</p></div><div class="rid">[X]</div></div>"#;
        let notes = notes_from_tiddler(html, "Dupes").unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn malformed_fixture_fails() {
        let html = std::fs::read_to_string("tests/fixtures/malformed.html").unwrap();
        let err = notes_from_tiddler(&html, "Broken").unwrap_err();
        assert!(matches!(err, Error::MalformedFragment { .. }));
    }
}
