//! Error type for the engine.
//!
//! Boolean, phrase and vector queries cannot fail; only the latent model,
//! which is built in the background, reports errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The SVD job has not finished yet
    #[error("latent model is still being built")]
    LatentNotReady,
    /// The SVD job was cancelled before it finished
    #[error("latent model build was cancelled")]
    LatentCancelled,
    /// The factorizer could not produce a decomposition
    #[error("factorization failed: {0}")]
    Factorization(String),
    /// The background build thread could not be started
    #[error("failed to start latent build worker: {0}")]
    WorkerSpawn(String),
}
