use super::{deck_and_tags, parse_twid, require, NOTE_ID};
use crate::error::Result;
use crate::note::TwNote;
use crate::parser::html::{Document, Selector};

const MARKER: Selector = Selector::tag_class("div", "remembercz");
// Any element carrying the class counts once we're parsing.
const ANY_MARKER: Selector = Selector::class("remembercz");
const CLOZE_TEXT: Selector = Selector::tag_class("span", "cloze-text");

pub fn wants_document(doc: &Document) -> bool {
    doc.find(&MARKER).is_some()
}

pub fn parse_html(doc: &Document, name: &str) -> Result<Vec<TwNote>> {
    let (deck, tags) = deck_and_tags(doc);
    let mut notes = Vec::new();

    for fragment in doc.find_all(&ANY_MARKER) {
        let text = require(fragment.find(&CLOZE_TEXT), name, "cloze-text")?.text();
        let id = parse_twid(&require(fragment.find(&NOTE_ID), name, "rid")?.text());
        notes.push(TwNote::cloze(id, name, text, tags.clone(), deck.clone()));
    }

    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::note::NoteBody;

    #[test]
    fn single_cloze() {
        let doc = Document::parse(
            "<ul id=\"anki-tags\"><li>geo</li></ul>\
             <div class=\"remembercz\"><span class=\"cloze-text\">Paris is in {{c1::France}}.</span>\
             <div class=\"rid\"> [C1] </div></div>",
        )
        .unwrap();
        assert!(wants_document(&doc));
        let notes = parse_html(&doc, "Cities").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "C1");
        assert!(notes[0].target_tags.contains("geo"));
        assert!(matches!(&notes[0].body, NoteBody::Cloze { text } if text == "Paris is in {{c1::France}}."));
    }

    #[test]
    fn missing_text_is_fatal() {
        let doc = Document::parse("<div class=\"remembercz\"><div class=\"rid\">[C1]</div></div>").unwrap();
        assert!(matches!(
            parse_html(&doc, "T"),
            Err(Error::MalformedFragment { ref missing, .. }) if missing == "cloze-text"
        ));
    }

    #[test]
    fn fixture() {
        let html = std::fs::read_to_string("tests/fixtures/cloze.html").unwrap();
        let doc = Document::parse(&html).unwrap();
        let notes = parse_html(&doc, "French Revolution").unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.target_deck.is_none()));
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"20190714120000"));
        assert!(ids.contains(&"20190714120100"));
    }
}
