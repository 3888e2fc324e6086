#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("location services are not available")]
    LocationUnavailable,
    #[error("no active session")]
    NotActive,
    #[error("live tracking needs a running tokio runtime")]
    NoRuntime,
    #[error("failed to spawn stream: {0}")]
    Spawn(String),
}
