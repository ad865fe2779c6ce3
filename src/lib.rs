//! Pull question/answer and cloze notes out of a rendered TiddlyWiki and
//! keep a flashcard collection in step with them.

pub mod batch;
pub mod db;
pub mod error;
pub mod models;
pub mod note;
pub mod parser;
pub mod reconcile;
pub mod render;
pub mod settings;
pub mod store;
pub mod sync;

pub use batch::{notes_from_paths, notes_from_tiddlers, RenderedTiddler};
pub use db::SqliteCollection;
pub use error::{Error, Result};
pub use note::{NoteBody, TwNote, Twid};
pub use parser::notes_from_tiddler;
pub use settings::Settings;
pub use store::{Collection, MemoryCollection, NoteModel, StoredNote};
pub use sync::{sync_notes, SyncReport};
