use thiserror::Error;

/// Errors raised while aggregating a single feed. `Skip` is not a failure of
/// the run itself: it signals that one article should be dropped and the
/// pipeline should keep going.
#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("article skipped: {reason}")]
    Skip { reason: String },

    #[error("feed identifier invalid: {reason}")]
    InvalidIdentifier { reason: String },

    #[error("aggregator not registered: {tag}")]
    UnknownAggregator { tag: String },

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

impl AggregatorError {
    pub fn skip(reason: impl Into<String>) -> Self {
        AggregatorError::Skip { reason: reason.into() }
    }

    /// True for the class of errors that should abort a site's article
    /// fetch but not the containing run (4xx responses, missing content).
    pub fn is_skippable(&self) -> bool {
        match self {
            AggregatorError::Skip { .. } => true,
            AggregatorError::Http(e) => e
                .status()
                .map(|s| s.is_client_error())
                .unwrap_or(false),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

/// Errors surfaced by the Google Reader HTTP transport. Maps 1:1 onto the
/// response shapes the reader clients understand.
#[derive(Error, Debug)]
pub enum GReaderError {
    #[error("BadAuthentication")]
    BadAuthentication,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type GReaderResult<T> = std::result::Result<T, GReaderError>;
