use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked before every mutation of a scripted sequence.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancel() {
        let token = CancelToken::new();
        let seen_by_driver = token.clone();
        assert!(!seen_by_driver.is_cancelled());
        token.cancel();
        assert!(seen_by_driver.is_cancelled());
    }
}
