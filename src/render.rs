use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::batch::{notes_from_paths, Progress, RENDERED_FILE_EXTENSION};
use crate::error::{Error, Result};
use crate::note::TwNote;
use crate::settings::Settings;

/// Tiddler that wraps each rendered tiddler in the note markup.
const RENDER_TEMPLATE: &str = "$:/sib/macros/remember";

/// Ask TiddlyWiki to render every tiddler matching `filter` into
/// `output_dir`, one `<title>.html` per tiddler.
///
/// A renderer that starts but exits non-zero is only logged: whatever it
/// managed to render is still worth scanning.
pub fn render_wiki(binary: &str, wiki_path: &Path, output_dir: &Path, filter: &str) -> Result<()> {
    info!("Rendering {:?} with {}", wiki_path, binary);
    let status = Command::new(binary)
        .current_dir(wiki_path)
        .arg("--output")
        .arg(output_dir)
        .arg("--render")
        .arg(filter)
        .arg(format!("[is[tiddler]addsuffix[.{}]]", RENDERED_FILE_EXTENSION))
        .arg("text/html")
        .arg(RENDER_TEMPLATE)
        .status()
        .map_err(|e| Error::Render(format!("{}: {}", binary, e)))?;

    if !status.success() {
        warn!("{} exited with {}; continuing with what was rendered", binary, status);
    }
    Ok(())
}

/// The rendered tiddlers in `dir`, sorted by file name.
pub fn rendered_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == RENDERED_FILE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Render the configured wiki into a scratch directory and collect its notes.
pub fn find_notes(settings: &Settings, progress: Option<Progress<'_>>) -> Result<HashSet<TwNote>> {
    let out = tempfile::tempdir()?;
    render_wiki(&settings.tiddlywiki, &settings.wiki_path, out.path(), &settings.filter)?;
    let paths = rendered_files(out.path())?;
    info!("{} tiddlers rendered", paths.len());
    notes_from_paths(&paths, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_html_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.html", "a.html", "notes.txt", "c.htm"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.html")).unwrap();

        let files = rendered_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.html", "b.html"]);
    }

    #[test]
    fn missing_binary_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_wiki("definitely-not-tiddlywiki-xyz", dir.path(), dir.path(), "[all[]]").unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failing_renderer_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_wiki("false", dir.path(), dir.path(), "[all[]]").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn find_notes_with_empty_render() {
        let settings = Settings {
            tiddlywiki: "true".into(),
            wiki_path: PathBuf::from("."),
            ..Settings::default()
        };
        let mut calls = Vec::new();
        let mut cb = |done: usize, total: usize| calls.push((done, total));
        let notes = find_notes(&settings, Some(&mut cb)).unwrap();
        assert!(notes.is_empty());
        assert_eq!(calls, vec![(0, 0)]);
    }
}
