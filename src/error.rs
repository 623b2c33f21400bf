//! Error types for instance construction.
//!
//! Everything a user callback returns flows through [`Error`]. Construction
//! never catches: a failing hook, data factory or mount call aborts the
//! remaining steps and surfaces to whoever asked for the instance.

use thiserror::Error;

/// Errors surfaced by construction, lifecycle and state operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A lifecycle hook handler failed.
    #[error("error in {hook} hook (instance {uid}): {source}")]
    Hook {
        /// Hook name, e.g. `created`.
        hook: &'static str,
        /// Uid of the instance the hook was bound to.
        uid: u64,
        /// The handler's error.
        source: Box<Error>,
    },

    /// The `data` factory failed.
    #[error("error in data() (instance {uid}): {source}")]
    Data {
        uid: u64,
        source: Box<Error>,
    },

    /// The `provide` factory failed.
    #[error("error in provide() (instance {uid}): {source}")]
    Provide {
        uid: u64,
        source: Box<Error>,
    },

    /// A render function failed during mount.
    #[error("error in render (instance {uid}): {source}")]
    Render {
        uid: u64,
        source: Box<Error>,
    },

    /// A watcher callback failed.
    #[error("error in callback for watcher \"{key}\": {source}")]
    Watcher {
        key: String,
        source: Box<Error>,
    },

    /// A method was invoked that the instance does not declare.
    #[error("method \"{0}\" is not defined on the instance")]
    UnknownMethod(String),

    /// A property was assigned that the instance does not declare.
    #[error("property \"{0}\" is not declared on the instance")]
    UnknownProperty(String),

    /// A vnode without component metadata was handed to child construction.
    #[error("vnode <{tag}> is not a component placeholder")]
    NotAComponent {
        tag: String,
    },

    /// Configuration could not be parsed.
    #[error("invalid runtime config: {0}")]
    Config(#[from] serde_json::Error),

    /// Free-form error raised by user callbacks.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Build a free-form error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }
}

/// Result type for construction operations.
pub type Result<T> = std::result::Result<T, Error>;
