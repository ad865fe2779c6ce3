use crate::error::{Error, Result};
use crate::note::{NoteBody, TwNote};
use crate::store::{Collection, StoredNote};

// Positions in the Q&A note type. "Wiki" (3) belongs to the sync, not to
// the note, and is neither compared nor written here.
const QA_QUESTION: usize = 0;
const QA_ANSWER: usize = 1;
const QA_ID: usize = 2;
const QA_REFERENCE: usize = 4;
const QA_PERMALINK: usize = 5;

impl TwNote {
    /// Tags as the collection wants them: spaces become underscores (the
    /// collection splits on spaces), then the collection's own canonify,
    /// minus the empty strings it sometimes produces.
    pub fn anki_tags(&self, col: &dyn Collection) -> Result<Vec<String>> {
        let munged = self.target_tags.iter().map(|t| t.replace(' ', "_")).collect();
        Ok(col
            .canonify_tags(munged)?
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect())
    }

    /// Point the note back at its tiddler. Replaces any earlier permalink.
    pub fn set_permalink(&mut self, base_url: &str) {
        let base = base_url.trim_end_matches('/');
        let fragment = urlencoding::encode(&self.tidref).replace("%2F", "/");
        self.permalink = Some(format!("{}/#{}", base, fragment));
    }

    fn permalink_value(&self) -> &str {
        self.permalink.as_deref().unwrap_or("")
    }

    /// `stored` must be of this note's type and laid out the way the
    /// catalog says, or no field position can be trusted.
    fn assert_correct_model(&self, stored: &StoredNote) -> Result<()> {
        let expected = self.model();
        if stored.model != expected.name {
            return Err(Error::ShapeMismatch {
                expected: expected.name.to_string(),
                found: stored.model.clone(),
            });
        }
        let same_layout = stored.field_names.iter().map(String::as_str).eq(expected.fields.iter().copied())
            && stored.fields.len() == expected.fields.len();
        if !same_layout {
            return Err(Error::ShapeMismatch {
                expected: format!("{} ({} fields)", expected.name, expected.fields.len()),
                found: format!("{} ({} fields)", stored.model, stored.fields.len()),
            });
        }
        Ok(())
    }

    /// True if `stored` already holds everything this note would write.
    pub fn fields_equal(&self, stored: &StoredNote, col: &dyn Collection) -> Result<bool> {
        self.assert_correct_model(stored)?;
        let at = |idx: usize| stored.fields.get(idx).map(String::as_str);

        let fields_match = match &self.body {
            NoteBody::Question { question, answer } => {
                at(QA_QUESTION) == Some(question.as_str())
                    && at(QA_ANSWER) == Some(answer.as_str())
                    && at(QA_ID) == Some(self.id.as_str())
                    && at(QA_REFERENCE) == Some(self.tidref.as_str())
                    && at(QA_PERMALINK) == Some(self.permalink_value())
            }
            NoteBody::Cloze { text } => {
                stored.field("Text") == Some(text.as_str())
                    && stored.field("ID") == Some(self.id.as_str())
                    && stored.field("Reference") == Some(self.tidref.as_str())
                    && stored.field("Permalink") == Some(self.permalink_value())
            }
        };

        Ok(fields_match && self.anki_tags(col)? == stored.tags)
    }

    /// Overwrite `stored` to match this note. Saving it is up to the caller.
    pub fn update_fields(&self, stored: &mut StoredNote, col: &dyn Collection) -> Result<()> {
        self.assert_correct_model(stored)?;
        let permalink = self.permalink_value().to_string();

        match &self.body {
            NoteBody::Question { question, answer } => {
                let values = [
                    (QA_QUESTION, question.as_str()),
                    (QA_ANSWER, answer.as_str()),
                    (QA_ID, self.id.as_str()),
                    (QA_REFERENCE, self.tidref.as_str()),
                    (QA_PERMALINK, permalink.as_str()),
                ];
                for (idx, value) in values {
                    if let Some(slot) = stored.fields.get_mut(idx) {
                        *slot = value.to_string();
                    }
                }
            }
            NoteBody::Cloze { text } => {
                stored.set_field("Text", text);
                stored.set_field("ID", &self.id);
                stored.set_field("Permalink", &permalink);
                stored.set_field("Reference", &self.tidref);
            }
        }

        stored.tags = self.anki_tags(col)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::{ensure_note_types, CLOZE, QUESTION_ANSWER};
    use crate::parser::notes_from_tiddler;
    use crate::store::MemoryCollection;

    fn collection() -> MemoryCollection {
        let mut col = MemoryCollection::new();
        ensure_note_types(&mut col).unwrap();
        col
    }

    fn blank(col: &MemoryCollection, name: &str) -> StoredNote {
        StoredNote::new(&col.model_by_name(name).unwrap().unwrap(), "Default")
    }

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positions_match_model() {
        let f = QUESTION_ANSWER.fields;
        assert_eq!(f[QA_QUESTION], "Question");
        assert_eq!(f[QA_ANSWER], "Answer");
        assert_eq!(f[QA_ID], "ID");
        assert_eq!(f[QA_REFERENCE], "Reference");
        assert_eq!(f[QA_PERMALINK], "Permalink");
    }

    #[test]
    fn permalink_encoding() {
        let mut note = TwNote::question("1".into(), "My Tiddler", "q".into(), "a".into(), BTreeSet::new(), None);
        note.set_permalink("https://wiki.example.com/wiki");
        assert_eq!(note.permalink.as_deref(), Some("https://wiki.example.com/wiki/#My%20Tiddler"));

        note.set_permalink("https://other.example.com//");
        assert_eq!(note.permalink.as_deref(), Some("https://other.example.com/#My%20Tiddler"));
    }

    #[test]
    fn permalink_keeps_slashes() {
        let mut note = TwNote::cloze("1".into(), "a/b & c?", "t".into(), BTreeSet::new(), None);
        note.set_permalink("http://localhost:8080/");
        assert_eq!(note.permalink.as_deref(), Some("http://localhost:8080/#a/b%20%26%20c%3F"));
    }

    #[test]
    fn tags_munged_and_empties_dropped() {
        let col = collection();
        let note = TwNote::question(
            "1".into(),
            "T",
            "q".into(),
            "a".into(),
            tags(&["foo bar", "Baz", "\"\""]),
            None,
        );
        assert_eq!(note.anki_tags(&col).unwrap(), vec!["Baz", "foo_bar"]);
    }

    #[test]
    fn round_trip_question() {
        let col = collection();
        let html = std::fs::read_to_string("tests/fixtures/question.html").unwrap();
        for mut note in notes_from_tiddler(&html, "Photosynthesis").unwrap() {
            note.set_permalink("https://example.com/wiki");
            let mut stored = blank(&col, QUESTION_ANSWER.name);
            assert!(!note.fields_equal(&stored, &col).unwrap());
            note.update_fields(&mut stored, &col).unwrap();
            assert!(note.fields_equal(&stored, &col).unwrap());
            assert_eq!(stored.field("Wiki"), Some(""));
        }
    }

    #[test]
    fn round_trip_cloze_twice() {
        let col = collection();
        let note = TwNote::cloze("C1".into(), "T", "{{c1::x}}".into(), tags(&["a b"]), None);
        let mut stored = blank(&col, CLOZE.name);
        note.update_fields(&mut stored, &col).unwrap();
        let once = stored.clone();
        note.update_fields(&mut stored, &col).unwrap();
        assert_eq!(stored, once);
        assert!(note.fields_equal(&stored, &col).unwrap());
        assert_eq!(stored.field("Permalink"), Some(""));
        assert_eq!(stored.tags, vec!["a_b"]);
    }

    #[test]
    fn unset_permalink_only_matches_empty() {
        let col = collection();
        let note = TwNote::cloze("C1".into(), "T", "x".into(), BTreeSet::new(), None);
        let mut stored = blank(&col, CLOZE.name);
        note.update_fields(&mut stored, &col).unwrap();
        stored.set_field("Permalink", "https://example.com/#T");
        assert!(!note.fields_equal(&stored, &col).unwrap());
    }

    #[test]
    fn each_field_matters() {
        let col = collection();
        let note = TwNote::question("Q1".into(), "T", "q".into(), "a".into(), tags(&["x"]), None);
        let mut stored = blank(&col, QUESTION_ANSWER.name);
        note.update_fields(&mut stored, &col).unwrap();

        for idx in [QA_QUESTION, QA_ANSWER, QA_ID, QA_REFERENCE, QA_PERMALINK] {
            let mut changed = stored.clone();
            changed.fields[idx].push('!');
            assert!(!note.fields_equal(&changed, &col).unwrap(), "field {} ignored", idx);
        }

        let mut retagged = stored.clone();
        retagged.tags.push("extra".into());
        assert!(!note.fields_equal(&retagged, &col).unwrap());
    }

    #[test]
    fn short_stored_note_is_an_error() {
        let col = collection();
        let note = TwNote::question("Q1".into(), "T", "q".into(), "a".into(), BTreeSet::new(), None);
        let mut stored = blank(&col, QUESTION_ANSWER.name);
        stored.fields.truncate(3);
        stored.field_names.truncate(3);

        assert!(matches!(note.update_fields(&mut stored, &col), Err(Error::ShapeMismatch { .. })));
        assert!(matches!(note.fields_equal(&stored, &col), Err(Error::ShapeMismatch { .. })));
        assert_eq!(stored.fields.len(), 3);
    }

    #[test]
    fn wrong_model_is_an_error() {
        let col = collection();
        let note = TwNote::cloze("C1".into(), "T", "x".into(), BTreeSet::new(), None);
        let mut stored = blank(&col, QUESTION_ANSWER.name);
        assert!(matches!(note.fields_equal(&stored, &col), Err(Error::ShapeMismatch { .. })));
        assert!(matches!(note.update_fields(&mut stored, &col), Err(Error::ShapeMismatch { .. })));
    }
}
