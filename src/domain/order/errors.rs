use crate::store::StoreError;

// ============================================================================
// Order Composition Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Order persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}

impl OrderError {
    /// Whether the caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::DirectoryUnavailable(_)
                | OrderError::Persistence(_)
                | OrderError::DeadlineExceeded
        )
    }

    /// Short label used for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::AccountNotFound(_) => "account_not_found",
            OrderError::DirectoryUnavailable(_) => "directory_unavailable",
            OrderError::Persistence(_) => "persistence",
            OrderError::Cancelled => "cancelled",
            OrderError::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(!OrderError::AccountNotFound("A1".into()).is_retryable());
        assert!(OrderError::DirectoryUnavailable("down".into()).is_retryable());
        assert!(OrderError::Persistence(StoreError::Corrupt("x".into())).is_retryable());
        assert!(!OrderError::Cancelled.is_retryable());
        assert!(OrderError::DeadlineExceeded.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            OrderError::AccountNotFound("A-missing".into()).to_string(),
            "Account not found: A-missing"
        );
        assert_eq!(OrderError::DeadlineExceeded.reason(), "deadline_exceeded");
    }
}
