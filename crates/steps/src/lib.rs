//! ILM steps: the asynchronous action step contract and the rollup step.
//!
//! A step computes its inputs from the snapshots it is handed, dispatches
//! at most one administrative action and reports back through a listener
//! that fires exactly once.

#![forbid(unsafe_code)]

use ilm_client::ClientError;

mod listener;
mod rollup;
mod runner;
mod step;

pub use listener::{ActionListener, StepListener};
pub use rollup::RollupStep;
pub use runner::{run_async_step, StepTransition};
pub use step::{AsyncActionStep, Step};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Required lifecycle state is missing or inconsistent. Never retried here.
    #[error("{0}")]
    IllegalState(String),
    /// Failure reported by the administrative call, carried unchanged.
    #[error(transparent)]
    Remote(#[from] ClientError),
    #[error("no async runtime available to dispatch [{0}]")]
    NoRuntime(&'static str),
    #[error("step listener dropped without completing")]
    ListenerDropped,
}

pub type StepResult<T> = Result<T, StepError>;
