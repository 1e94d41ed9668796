use crate::readiness::SourceState;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReadinessResponse {
    pub ready: bool,
    pub instance: u64,
    pub events: SourceState,
    pub battery: SourceState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReloadResponse {
    pub instance: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
}
