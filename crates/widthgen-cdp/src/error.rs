pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid DevTools host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("DevTools HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no pages open")]
    NoPage,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("DevTools connection closed")]
    Closed,

    #[error("DevTools protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("script evaluation threw: {0}")]
    Evaluation(String),

    #[error("malformed DevTools message: {0}")]
    Json(#[from] serde_json::Error),
}
