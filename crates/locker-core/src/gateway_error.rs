use thiserror::Error;

#[derive(Debug, Error)]
/// Failure reported by a gateway lookup (member fetch, history read).
pub enum GatewayError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("gateway transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}
