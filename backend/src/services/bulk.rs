//! Time budgets for bulk operations

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{AppError, AppResult};

/// A point in time after which no further bulk items are started
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Run one item within what is left of the budget. A future cut off by
    /// the deadline is dropped, which rolls back its open transaction.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(AppError::Timeout(format!(
                "{} ran out of time before this item was processed",
                operation
            )));
        }
        within(remaining, operation, fut).await
    }
}

/// Run `fut` under a timeout, mapping expiry to [`AppError::Timeout`]
pub(crate) async fn within<T, F>(budget: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} exceeded its {}s budget; retry with fewer items",
            operation,
            budget.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_deadline_skips_work() {
        let deadline = Deadline::after(Duration::ZERO);
        let result = deadline.run("bulk delete", async { Ok::<_, AppError>(1) }).await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn fast_work_completes_within_budget() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let result = deadline.run("bulk delete", async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_work_times_out() {
        let result = within(Duration::from_secs(1), "delete releases", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await;
        match result {
            Err(AppError::Timeout(msg)) => assert!(msg.contains("delete releases")),
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }
}
