//! Fork-join execution with cancel-on-first-error.

use std::sync::{Mutex, PoisonError};

use tsblock_common::Result;

use crate::{CancellationToken, FetchPool};

/// Runs `f` once per item on `pool` and blocks until every task has finished.
///
/// All tasks share `token`. The first task to fail cancels it; tasks that have not
/// started yet are skipped and running tasks are expected to observe the token at
/// their next blocking call. Returns `Ok(())` only if every task succeeded,
/// otherwise the first non-cancellation error. Tasks are started in item order.
pub fn try_for_each<T, F>(
    pool: &FetchPool,
    token: &CancellationToken,
    items: impl IntoIterator<Item = T>,
    f: F,
) -> Result<()>
where
    T: Send,
    F: Fn(T, &CancellationToken) -> Result<()> + Send + Sync,
{
    let items = items.into_iter().collect::<Vec<_>>();
    let first_error = Mutex::new(None);
    let f = &f;
    let first_error_ref = &first_error;

    pool.thread_pool().scope_fifo(|scope| {
        for item in items {
            scope.spawn_fifo(move |_| {
                if token.is_cancelled() {
                    return;
                }
                if let Err(e) = f(item, token) {
                    record_error(first_error_ref, e);
                    token.cancel();
                }
            });
        }
    });

    match first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
        Some(e) => Err(e),
        None => token.check(),
    }
}

/// Keeps the first failure that is not a mere echo of the cancellation.
fn record_error(slot: &Mutex<Option<tsblock_common::Error>>, e: tsblock_common::Error) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        None => *slot = Some(e),
        Some(existing) if existing.is_cancelled() && !e.is_cancelled() => *slot = Some(e),
        Some(_) => log::trace!("suppressing secondary task error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use tsblock_common::{ErrorKind, error::Error};

    use super::try_for_each;
    use crate::{CancellationToken, FetchPool};

    #[test]
    fn test_all_tasks_succeed() {
        let pool = FetchPool::new(4).unwrap();
        let token = CancellationToken::new();
        let sum = AtomicUsize::new(0);
        try_for_each(&pool, &token, 1..=100usize, |i, _| {
            sum.fetch_add(i, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert_eq!(sum.load(Ordering::Relaxed), 5050);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_first_error_cancels_later_tasks() {
        let pool = FetchPool::new(1).unwrap();
        let token = CancellationToken::new();
        let executed = Mutex::new(Vec::new());
        let res = try_for_each(&pool, &token, 0..5usize, |i, token| {
            token.check()?;
            executed.lock().unwrap().push(i);
            if i == 2 {
                return Err(Error::invalid_operation("task 2"));
            }
            Ok(())
        });
        let err = res.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { name } if name == "task 2"));
        assert_eq!(*executed.lock().unwrap(), [0, 1, 2]);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_originating_error_wins_over_cancellation() {
        let pool = FetchPool::new(4).unwrap();
        let token = CancellationToken::new();
        let res = try_for_each(&pool, &token, 0..16usize, |i, token| {
            if i == 7 {
                token.cancel();
                return Err(Error::invalid_operation("origin"));
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
            token.check()
        });
        assert!(matches!(
            res.unwrap_err().kind(),
            ErrorKind::InvalidOperation { name } if name == "origin"
        ));
    }

    #[test]
    fn test_pre_cancelled_token_runs_nothing() {
        let pool = FetchPool::new(2).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let executed = AtomicUsize::new(0);
        let res = try_for_each(&pool, &token, 0..3usize, |_, _| {
            executed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        assert!(res.unwrap_err().is_cancelled());
        assert_eq!(executed.load(Ordering::Relaxed), 0);
    }
}
