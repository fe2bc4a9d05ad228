//! Error taxonomy for calls against the spreadsheet.

use super::state::ClientState;

/// Raw failure reported by a transport before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status, or `None` when no response arrived.
    pub status: Option<u16>,
    pub message: String,
    /// The request succeeded but its response body could not be read.
    pub malformed_body: bool,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            malformed_body: false,
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// A failure with no HTTP response (connection refused, DNS, timeout).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// A successful response whose body did not have the expected shape.
    /// The request may have taken effect, so it must not be resent.
    pub fn malformed_body(status: u16, message: impl Into<String>) -> Self {
        Self {
            malformed_body: true,
            ..Self::new(Some(status), message)
        }
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors that can occur when talking to the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// No bearer token is available
    NotSignedIn,
    /// Client has not reached the ready state
    NotReady(ClientState),
    /// Spreadsheet id is not configured
    MissingSpreadsheetId,
    /// The sheet rejected the range, usually a layout or sheet-name problem
    RangeParse { range: String },
    /// Token expired or was revoked; the stored token has been cleared
    Unauthenticated,
    /// Token lacks access to the spreadsheet
    Forbidden(String),
    /// Spreadsheet or sheet does not exist
    NotFound(String),
    /// Quota exceeded after all retries
    RateLimited,
    /// Any other failure after all retries
    Api(String),
    /// Response body did not have the expected shape
    InvalidResponse(String),
}

impl SheetError {
    /// Maps a transport failure onto the taxonomy.
    pub fn classify(failure: &ApiFailure, range: &str) -> Self {
        if failure.malformed_body {
            return SheetError::InvalidResponse(failure.message.clone());
        }
        if failure
            .message
            .to_lowercase()
            .contains("unable to parse range")
        {
            return SheetError::RangeParse {
                range: range.to_string(),
            };
        }
        match failure.status {
            Some(401) => SheetError::Unauthenticated,
            Some(403) => SheetError::Forbidden(failure.message.clone()),
            Some(404) => SheetError::NotFound(failure.message.clone()),
            Some(429) => SheetError::RateLimited,
            _ => SheetError::Api(failure.message.clone()),
        }
    }

    /// True for failures that may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, SheetError::RateLimited | SheetError::Api(_))
    }
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::NotSignedIn => write!(f, "Not signed in. Run `vocasync auth set-token`."),
            SheetError::NotReady(state) => {
                write!(f, "Spreadsheet client not ready (state: {})", state)
            }
            SheetError::MissingSpreadsheetId => write!(
                f,
                "Spreadsheet ID not configured. Set sheet.spreadsheet_id in config."
            ),
            SheetError::RangeParse { range } => {
                write!(f, "Error parsing range \"{}\". Check sheet name/range.", range)
            }
            SheetError::Unauthenticated => write!(f, "Auth failed/expired. Sign in again."),
            SheetError::Forbidden(msg) => write!(f, "Permission denied: {}", msg),
            SheetError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SheetError::RateLimited => write!(f, "Too many requests. Please try again later."),
            SheetError::Api(msg) => write!(f, "API error: {}", msg),
            SheetError::InvalidResponse(msg) => write!(f, "Unexpected API response: {}", msg),
        }
    }
}

impl std::error::Error for SheetError {}
