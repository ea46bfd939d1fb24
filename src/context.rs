use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::order::OrderError;

// ============================================================================
// Request Context - caller deadline and cancellation
// ============================================================================
//
// Threaded through every blocking call of a request. A step that loses the
// race against the deadline or the token is dropped, which abandons whatever
// it had in flight (an uncommitted store transaction rolls back on drop).
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// No deadline, never cancelled unless `cancel` is called
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Tighten the deadline; an earlier existing deadline wins
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// Cancelled whenever `parent` is cancelled
    pub fn child_of(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Run one step under this context
    pub async fn run<F, T, E>(&self, step: F) -> Result<T, OrderError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<OrderError>,
    {
        if self.cancel.is_cancelled() {
            return Err(OrderError::Cancelled);
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(OrderError::Cancelled),
                result = step => result.map_err(Into::into),
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(OrderError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let ctx = RequestContext::background();
        let result = ctx.run(async { Ok::<_, OrderError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_converts_step_error() {
        let ctx = RequestContext::background();
        let result: Result<(), _> = ctx
            .run(async { Err(StoreError::Corrupt("bad".into())) })
            .await;
        assert!(matches!(result, Err(OrderError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_run_honors_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, OrderError>(())
            })
            .await;
        assert!(matches!(result, Err(OrderError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_run_honors_cancellation() {
        let ctx = RequestContext::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, OrderError>(())
            })
            .await;
        assert!(matches!(result, Err(OrderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_starts_step() {
        let ctx = RequestContext::background();
        ctx.cancel();
        let mut started = false;
        let result = ctx
            .run(async {
                started = true;
                Ok::<_, OrderError>(())
            })
            .await;
        assert!(matches!(result, Err(OrderError::Cancelled)));
        assert!(!started);
    }

    #[tokio::test]
    async fn test_child_context_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = RequestContext::background().child_of(&parent);
        parent.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(100))
            .timeout(Duration::from_secs(60));
        assert!(ctx.remaining().unwrap() <= Duration::from_millis(100));
    }
}
