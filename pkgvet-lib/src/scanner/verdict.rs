use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit code for a clean run.
pub const EXIT_OK: u8 = 0;

/// Exit code for configuration, I/O, or pipeline errors.
pub const EXIT_ERROR: u8 = 1;

/// Exit code when a fail-on-match filter matched at least one package.
pub const EXIT_POLICY_VIOLATION: u8 = 2;

/// Process-wide pass/fail verdict, separate from error propagation.
///
/// Initially passing; flipped to failed by any analyzer configured to fail
/// the run whose filter matched an (unsuppressed) package. Shared between
/// the scanner and the command layer, which translates it into the process
/// exit code.
#[derive(Debug, Clone, Default)]
pub struct VerdictTracker {
    failed: Arc<AtomicBool>,
}

impl VerdictTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a fail-on-match filter fired.
    pub fn record_failure(&self) {
        self.failed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// The exit code this verdict translates to (absent any error).
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.is_failed() { EXIT_POLICY_VIOLATION } else { EXIT_OK }
    }
}
