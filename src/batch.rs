use std::borrow::Borrow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::note::TwNote;
use crate::parser::notes_from_tiddler;

pub const RENDERED_FILE_EXTENSION: &str = "html";
const PROGRESS_EVERY: usize = 50;

/// Receives (documents processed, total documents).
pub type Progress<'a> = &'a mut dyn FnMut(usize, usize);

/// One rendered tiddler: its title and its HTML.
#[derive(Debug, Clone)]
pub struct RenderedTiddler {
    pub name: String,
    pub html: String,
}

impl RenderedTiddler {
    /// Read `<name>.html`. The tiddler name is the file name minus the extension.
    pub fn read(path: &Path) -> Result<Self> {
        let html = fs::read_to_string(path)?;
        Ok(RenderedTiddler {
            name: tiddler_name(path),
            html,
        })
    }
}

pub fn tiddler_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = format!(".{}", RENDERED_FILE_EXTENSION);
    match file_name.strip_suffix(&suffix) {
        Some(name) => name.to_string(),
        None => file_name,
    }
}

/// Collect the notes in every tiddler, in order. The first malformed
/// tiddler aborts the whole batch.
pub fn notes_from_tiddlers(
    tiddlers: &[RenderedTiddler],
    progress: Option<Progress<'_>>,
) -> Result<HashSet<TwNote>> {
    collect_notes(tiddlers.iter().map(Ok), tiddlers.len(), progress)
}

/// Like `notes_from_tiddlers`, reading each tiddler from disk as it goes.
pub fn notes_from_paths(paths: &[PathBuf], progress: Option<Progress<'_>>) -> Result<HashSet<TwNote>> {
    let tiddlers = paths.iter().map(|p| RenderedTiddler::read(p));
    collect_notes(tiddlers, paths.len(), progress)
}

fn collect_notes<T: Borrow<RenderedTiddler>>(
    tiddlers: impl Iterator<Item = Result<T>>,
    total: usize,
    mut progress: Option<Progress<'_>>,
) -> Result<HashSet<TwNote>> {
    let mut notes = HashSet::new();

    for (index, tiddler) in tiddlers.enumerate() {
        let tiddler = tiddler?;
        let tiddler = tiddler.borrow();
        notes.extend(notes_from_tiddler(&tiddler.html, &tiddler.name)?);

        let done = index + 1;
        if done % PROGRESS_EVERY == 0 {
            if let Some(cb) = progress.as_mut() {
                cb(done, total);
            }
        }
    }

    if let Some(cb) = progress.as_mut() {
        cb(total, total);
    }
    info!("Found {} notes in {} tiddlers", notes.len(), total);
    Ok(notes)
}
