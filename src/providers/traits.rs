use crate::error::GenerationError;
use crate::session::Turn;
use async_trait::async_trait;

/// Text generation collaborator: ordered history in, one reply out.
///
/// Implementations must be cancel-safe: the dispatcher drops the future when
/// its shutdown token fires.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, history: &[Turn]) -> Result<String, GenerationError>;

    /// Warm up the HTTP connection pool. Default is a no-op.
    async fn warmup(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}
