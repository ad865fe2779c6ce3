use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A marker fragment lacks one of the sub-structures its note type needs.
    #[error("malformed note in tiddler {document:?}: missing {missing}")]
    MalformedFragment { document: String, missing: String },

    /// A stored note was handed to a TwNote bound to a different note type.
    #[error("expected note of type {expected:?}, but got {found:?}")]
    ShapeMismatch { expected: String, found: String },

    #[error("unknown note type {0:?}")]
    UnknownModel(String),

    #[error("could not tokenize tiddler {document:?}: {source}")]
    Html {
        document: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("failed to run TiddlyWiki: {0}")]
    Render(String),

    #[error("invalid settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
