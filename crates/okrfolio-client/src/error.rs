use serde::Deserialize;

/// One rejected request field, as reported in a 400 envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Client: transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-zero `err_code`.
    #[error("Client: API error {err_code} (HTTP {status}): {err_msg}")]
    Api {
        status: u16,
        err_code: i32,
        err_msg: String,
        trace_id: String,
        fields: Vec<FieldError>,
    },

    /// A success envelope without the expected `data`.
    #[error("Client: response carried no data")]
    EmptyData,

    #[error("Client: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the local session file failed.
    #[error("Client: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True when the stored credential is missing, expired or rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }

    /// Field names of a validation failure; empty for any other error.
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            ClientError::Api { fields, .. } => fields.iter().map(|f| f.field.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
