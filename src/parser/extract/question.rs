use super::{deck_and_tags, parse_twid, require, NOTE_ID};
use crate::error::Result;
use crate::note::TwNote;
use crate::parser::html::{Document, Selector};

const PAIR: Selector = Selector::tag_class("div", "rememberq");
const QUESTION: Selector = Selector::tag_class("div", "rquestion");
const ANSWER: Selector = Selector::tag_class("div", "ranswer");
const PARAGRAPH: Selector = Selector::tag("p");

pub fn wants_document(doc: &Document) -> bool {
    doc.find(&PAIR).is_some()
}

pub fn parse_html(doc: &Document, name: &str) -> Result<Vec<TwNote>> {
    let (deck, tags) = deck_and_tags(doc);
    let mut notes = Vec::new();

    for pair in doc.find_all(&PAIR) {
        let question = require(pair.find(&QUESTION), name, "rquestion")?;
        let question = require(question.find(&PARAGRAPH), name, "rquestion paragraph")?.text();
        let answer = require(pair.find(&ANSWER), name, "ranswer")?;
        let answer = require(answer.find(&PARAGRAPH), name, "ranswer paragraph")?.text();
        let id = parse_twid(&require(pair.find(&NOTE_ID), name, "rid")?.text());

        notes.push(TwNote::question(id, name, question, answer, tags.clone(), deck.clone()));
    }

    Ok(notes)
}
