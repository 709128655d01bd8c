use thiserror::Error;

const SEPARATOR: &str =
    "-------------------------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum GracliError {
    #[error(
        "graphite returned an error (status={status}):\n{sep}\nGraphite response\n{sep}\n{body}\n{sep}",
        sep = SEPARATOR
    )]
    BadResponse { status: u16, body: String },

    #[error("invalid data format: {0}")]
    InvalidDataFormat(String),

    #[error("empty data: {0}")]
    EmptyData(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl GracliError {
    /// True for failures caused by the shape or content of the returned data.
    /// These will not go away by repeating the request.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::InvalidDataFormat(_) | Self::EmptyData(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GracliError>;
