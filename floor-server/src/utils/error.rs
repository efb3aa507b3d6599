//! 统一错误处理
//!
//! [`AppError`] is what the public service surface returns. Lower layers keep
//! their own error enums ([`StoreError`], [`DispatchError`]) and convert at
//! the boundary. A malformed document is never an error here: ingestion
//! reports it as an [`IngestOutcome`] and moves on.
//!
//! # 错误分类
//!
//! | 分类 | 说明 | 处理 |
//! |------|------|------|
//! | Configuration | 凭据缺失/无效、项目不可达 | 报告一次，不自动重试 |
//! | Transient | 单次远程调用失败 | 返回给调用方，不重试 |
//! | Internal | 所有者线程已退出等 | 返回给调用方 |
//!
//! [`StoreError`]: crate::remote::StoreError
//! [`IngestOutcome`]: crate::web_orders::IngestOutcome
//! [`DispatchError`]: crate::core::DispatchError

use crate::core::DispatchError;
use crate::remote::StoreError;

/// Error category, mirrors how each kind of failure is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing startup input; a human has to fix it
    Configuration,
    /// One remote call failed; the caller may try again later
    Transient,
    /// Caller misuse
    Validation,
    Internal,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Web order service is not connected")]
    NotConnected,

    #[error("Web order service is already listening")]
    AlreadyListening,

    #[error("Web order listener start was cancelled by stop")]
    StartCancelled,

    #[error("Remote store error: {0}")]
    Remote(#[from] StoreError),

    #[error("Failed to delete {} of {attempted} documents: {}", failed.len(), failed.join(", "))]
    PartialDelete {
        attempted: usize,
        failed: Vec<String>,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Config(_) => ErrorCategory::Configuration,
            AppError::Remote(e) if e.is_configuration() => ErrorCategory::Configuration,
            AppError::Remote(_) | AppError::PartialDelete { .. } => ErrorCategory::Transient,
            AppError::NotConnected
            | AppError::AlreadyListening
            | AppError::StartCancelled
            | AppError::Validation(_) => ErrorCategory::Validation,
            AppError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::internal(e.to_string())
    }
}

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_handling_policy() {
        assert_eq!(
            AppError::config("missing").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            AppError::from(StoreError::Unauthenticated("bad key".into())).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("timeout".into())).category(),
            ErrorCategory::Transient
        );
        assert_eq!(AppError::NotConnected.category(), ErrorCategory::Validation);
        assert_eq!(
            AppError::from(DispatchError::OwnerStopped).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn partial_delete_names_failed_ids() {
        let err = AppError::PartialDelete {
            attempted: 3,
            failed: vec!["a".into(), "c".into()],
        };
        assert_eq!(err.to_string(), "Failed to delete 2 of 3 documents: a, c");
    }
}
