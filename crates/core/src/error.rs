/// Result alias that carries the custom [`PlayerCoreError`] type.
pub type Result<T> = std::result::Result<T, PlayerCoreError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PlayerCoreError {
    /// The chapter table handed over when opening a book is malformed. The
    /// book cannot be opened with it; callers may fall back to synthesized
    /// chapters instead.
    #[error("invalid chapter table at chapter {index}: {reason}")]
    InvalidChapterTable { index: usize, reason: String },
    /// No bookmark exists at exactly this position.
    #[error("no bookmark at {position_ms} ms")]
    BookmarkNotFound { position_ms: u64 },
    /// The session's spacing policy refused a bookmark next to an existing one.
    #[error("bookmark at {position_ms} ms is too close to existing bookmark at {existing_ms} ms")]
    BookmarkTooClose { position_ms: u64, existing_ms: u64 },
    /// Free-form failure surfaced to the host as a readable message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PlayerCoreError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_table<T: Into<String>>(index: usize, reason: T) -> Self {
        Self::InvalidChapterTable {
            index,
            reason: reason.into(),
        }
    }
}

impl From<String> for PlayerCoreError {
    fn from(value: String) -> Self {
        Self::msg(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_chapter_table_errors_with_index() {
        let err = PlayerCoreError::invalid_table(3, "chapter starts before previous end");
        let text = format!("{err}");
        assert!(text.contains("chapter 3"));
        assert!(text.contains("previous end"));
    }

    #[test]
    fn converts_formatted_messages() {
        let err = PlayerCoreError::from(format!("invalid config `{}`", "session.toml"));
        assert!(matches!(err, PlayerCoreError::Message(ref m) if m.contains("session.toml")));
        assert_eq!(err.to_string(), "invalid config `session.toml`");
    }
}
