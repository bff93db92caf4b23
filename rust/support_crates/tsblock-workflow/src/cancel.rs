use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tsblock_common::{
    Result,
    error::{Error, cancelled_io},
};

/// A cloneable cancellation flag shared by all tasks of one fork-join scope.
///
/// Cancellation is cooperative: tasks call [`CancellationToken::check`] (or
/// [`CancellationToken::check_io`]) before each blocking operation and unwind
/// when it fails.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Default::default()
    }

    /// Requests cancellation of every task sharing this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fails with [`ErrorKind::Cancelled`](tsblock_common::ErrorKind::Cancelled)
    /// once the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }

    /// The `std::io` flavor of [`CancellationToken::check`], for use inside
    /// `Read` implementations. The returned error converts back into a
    /// cancellation error.
    pub fn check_io(&self) -> std::io::Result<()> {
        if self.is_cancelled() {
            Err(cancelled_io())
        } else {
            Ok(())
        }
    }
}
