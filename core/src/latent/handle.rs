use super::{CancelToken, Factorizer, JacobiSvd, LatentSemanticModel};
use crate::error::EngineError;
use crate::index::InvertedIndex;
use crate::tfidf::TfIdfWeighter;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

enum LatentState {
    Building,
    Ready(Arc<LatentSemanticModel>),
    Failed(EngineError),
}

struct Slot {
    state: Mutex<LatentState>,
    done: Condvar,
    cancel: CancelToken,
}

impl Slot {
    fn publish(&self, result: Result<LatentSemanticModel, EngineError>) {
        let mut state = self.state.lock();
        *state = match result {
            Ok(model) => LatentState::Ready(Arc::new(model)),
            Err(err) => {
                tracing::warn!(error = %err, "latent model unavailable");
                LatentState::Failed(err)
            }
        };
        self.done.notify_all();
    }
}

/// Shared handle to a latent model that is factorized in the background.
///
/// Readers either fail fast ([`LatentHandle::try_get`]) or block
/// ([`LatentHandle::wait`]) until the build job publishes its result.
/// Clones share the same slot.
#[derive(Clone)]
pub struct LatentHandle {
    slot: Arc<Slot>,
}

impl LatentHandle {
    fn with_state(state: LatentState) -> Self {
        Self { slot: Arc::new(Slot { state: Mutex::new(state), done: Condvar::new(), cancel: CancelToken::new() }) }
    }

    /// Handle for a model that is already built.
    pub fn ready(model: LatentSemanticModel) -> Self { Self::with_state(LatentState::Ready(Arc::new(model))) }

    /// Start factorizing on a dedicated thread with the default Jacobi SVD.
    pub fn spawn(index: Arc<InvertedIndex>, weighter: Arc<TfIdfWeighter>, dimensions: usize) -> Self {
        Self::spawn_with(index, weighter, dimensions, Arc::new(JacobiSvd))
    }

    pub fn spawn_with(
        index: Arc<InvertedIndex>,
        weighter: Arc<TfIdfWeighter>,
        dimensions: usize,
        factorizer: Arc<dyn Factorizer>,
    ) -> Self {
        let handle = Self::with_state(LatentState::Building);
        let slot = Arc::clone(&handle.slot);
        let spawned = thread::Builder::new().name("latent-build".into()).spawn(move || {
            let started = std::time::Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                LatentSemanticModel::build(&index, &weighter, dimensions, factorizer.as_ref(), &slot.cancel)
            }))
            .unwrap_or_else(|payload| {
                Err(EngineError::Factorization(format!("build panicked: {}", panic_message(&*payload))))
            });
            tracing::info!(ok = result.is_ok(), took_s = started.elapsed().as_secs_f64(), "latent build finished");
            slot.publish(result);
        });
        if let Err(err) = spawned {
            handle.slot.publish(Err(EngineError::WorkerSpawn(err.to_string())));
        }
        handle
    }

    /// Ask the build job to stop. No effect once the model is published.
    pub fn cancel(&self) { self.slot.cancel.cancel(); }

    pub fn is_ready(&self) -> bool { matches!(*self.slot.state.lock(), LatentState::Ready(_)) }

    /// The model if it is ready, `LatentNotReady` while building, or the build error.
    pub fn try_get(&self) -> Result<Arc<LatentSemanticModel>, EngineError> {
        match &*self.slot.state.lock() {
            LatentState::Building => Err(EngineError::LatentNotReady),
            LatentState::Ready(model) => Ok(Arc::clone(model)),
            LatentState::Failed(err) => Err(err.clone()),
        }
    }

    /// Block until the build job finishes.
    pub fn wait(&self) -> Result<Arc<LatentSemanticModel>, EngineError> {
        let mut state = self.slot.state.lock();
        while matches!(*state, LatentState::Building) {
            self.slot.done.wait(&mut state);
        }
        match &*state {
            LatentState::Ready(model) => Ok(Arc::clone(model)),
            LatentState::Failed(err) => Err(err.clone()),
            LatentState::Building => Err(EngineError::LatentNotReady),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
