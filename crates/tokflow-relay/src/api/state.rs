use crate::upstream::UpstreamClient;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
}
