use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag a caller raises to stop a running compression.
///
/// Clones observe the same flag, so one clone can be handed to another
/// thread while the pipeline keeps the other.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Result of work that can be aborted by a [`CancellationToken`].
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Aborted,
}

impl<T> Outcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Aborted => None,
        }
    }
}

/// Unwraps a completed outcome or returns `Ok(Outcome::Aborted)` from the
/// enclosing function.
macro_rules! completed_or_abort {
    ($outcome:expr) => {
        match $outcome {
            $crate::cancellation::Outcome::Completed(value) => value,
            $crate::cancellation::Outcome::Aborted => {
                return Ok($crate::cancellation::Outcome::Aborted)
            }
        }
    };
}

pub(crate) use completed_or_abort;
