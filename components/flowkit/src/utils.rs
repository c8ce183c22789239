use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use slog::Logger;

use crate::FlowkitError;

/// Ambient state handed to every toolkit operation: where to log, and whether
/// the caller gave up waiting.
#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn empty() -> Context {
        Context {
            logger: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn new(logger: Logger) -> Context {
        Context {
            logger: Some(logger),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }

    /// Flags every clone of this context as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check_cancelled(&self) -> Result<(), FlowkitError> {
        if self.is_cancelled() {
            Err(FlowkitError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::empty()
    }
}
