use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("page state lock poisoned")]
    StateLock,
    #[error("view lock poisoned")]
    ViewLock,
    #[error("readiness channel closed")]
    ReadinessClosed,
    #[error("date format failed: {0}")]
    Format(#[from] time::error::Format),
    #[error("template render failed: {0}")]
    Render(#[from] askama::Error),
    #[error("http client error: {0}")]
    HttpClient(String),
    #[error("date out of supported range: {0}")]
    DateRange(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
