use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatleadError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Input rejected: {0}")]
    InputRejected(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification a boundary layer can map to its own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputRejected,
    Invariant,
    NotFound,
    Collaborator,
}

impl ChatleadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatleadError::InputRejected(_) => ErrorKind::InputRejected,
            ChatleadError::Invariant(_) => ErrorKind::Invariant,
            ChatleadError::NotFound(_) => ErrorKind::NotFound,
            // A corrupt zip is the caller's input, not a storage failure.
            ChatleadError::Archive(_) => ErrorKind::InputRejected,
            ChatleadError::Csv(_) => ErrorKind::InputRejected,
            ChatleadError::Database(_) | ChatleadError::Io(_) | ChatleadError::Json(_) => {
                ErrorKind::Collaborator
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatleadError>;
