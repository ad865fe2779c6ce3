use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::db::DEFAULT_DB_PATH;
use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "remember.toml";
pub const ENV_PREFIX: &str = "REMEMBER";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TiddlyWiki executable used to render tiddlers.
    pub tiddlywiki: String,
    pub wiki_path: PathBuf,
    /// TiddlyWiki filter selecting the tiddlers to search for notes.
    pub filter: String,
    /// When set, every note links back to its tiddler under this URL.
    pub base_url: Option<String>,
    /// Written into the "Wiki" field of new notes.
    pub wiki_name: String,
    /// Deck for notes whose tiddler names none.
    pub default_deck: String,
    pub database: PathBuf,
    /// Delete stored notes whose ID no longer appears in the wiki.
    pub remove_orphans: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tiddlywiki: "tiddlywiki".into(),
            wiki_path: PathBuf::from("."),
            filter: "[!is[system]type[text/vnd.tiddlywiki]]".into(),
            base_url: None,
            wiki_name: "Wiki".into(),
            default_deck: "Default".into(),
            database: PathBuf::from(DEFAULT_DB_PATH),
            remove_orphans: false,
        }
    }
}

impl Settings {
    /// Layer `REMEMBER_*` environment variables over a TOML file. An
    /// explicit `path` must exist; the default `remember.toml` may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let settings = Config::builder()
            .add_source(File::from(file).format(FileFormat::Toml).required(required))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.tiddlywiki, "tiddlywiki");
        assert_eq!(s.filter, "[!is[system]type[text/vnd.tiddlywiki]]");
        assert_eq!(s.database, PathBuf::from("data/remember.sqlite"));
        assert!(s.base_url.is_none());
        assert!(!s.remove_orphans);
    }

    #[test]
    fn file_overrides_some_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remember.toml");
        fs::write(
            &path,
            "wiki_path = \"/srv/zk\"\nbase_url = \"https://wiki.example.com/\"\nremove_orphans = true\n",
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.wiki_path, PathBuf::from("/srv/zk"));
        assert_eq!(s.base_url.as_deref(), Some("https://wiki.example.com/"));
        assert!(s.remove_orphans);
        assert_eq!(s.wiki_name, "Wiki");
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
