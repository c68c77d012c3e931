use std::fmt;

use tokio::sync::oneshot;
use tracing::warn;

use crate::StepError;

type Callback<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

/// Single-shot completion callback.
///
/// Every completion method consumes the listener, so it can fire at most
/// once and never both ways. Dropping it unfired is a contract violation:
/// it is logged, and a channel listener's receiver sees a closed channel.
pub struct ActionListener<T, E = StepError> {
    inner: Option<Callback<T, E>>,
}

/// Listener handed to `AsyncActionStep::perform_action`; `true` means the step is complete.
pub type StepListener = ActionListener<bool, StepError>;

impl<T, E> ActionListener<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Self { inner: Some(Box::new(f)) }
    }

    pub fn wrap<R, F>(on_response: R, on_failure: F) -> Self
    where
        R: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        Self::from_fn(move |res| match res {
            Ok(v) => on_response(v),
            Err(e) => on_failure(e),
        })
    }

    /// Listener whose outcome is delivered on a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        let listener = Self::from_fn(move |res| {
            let _ = tx.send(res);
        });
        (listener, rx)
    }
}

impl<T, E> ActionListener<T, E> {
    pub fn on_response(self, value: T) {
        self.complete(Ok(value))
    }

    pub fn on_failure(self, error: E) {
        self.complete(Err(error))
    }

    pub fn complete(mut self, result: Result<T, E>) {
        if let Some(f) = self.inner.take() {
            f(result);
        }
    }
}

impl<T, E> Drop for ActionListener<T, E> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("action listener dropped without being completed");
        }
    }
}

impl<T, E> fmt::Debug for ActionListener<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionListener").field("pending", &self.inner.is_some()).finish()
    }
}
