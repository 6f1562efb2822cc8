//! Helper functions for creating and classifying errors

use super::types::BatchError;

/// Helper functions for creating specific errors
impl BatchError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn chunk<S: Into<String>>(message: S) -> Self {
        Self::ChunkExecution(message.into())
    }

    pub fn fatal<S: Into<String>>(message: S) -> Self {
        Self::FatalInfrastructure(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error must abort the whole call
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalInfrastructure(_))
    }

    /// Whether a chunk attempt that failed with this error may be retried
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::FatalInfrastructure(_) | Self::Config(_) | Self::Validation(_)
        )
    }

    /// Short machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Validation(_) => "validation_error",
            Self::ChunkExecution(_) => "chunk_execution_error",
            Self::FatalInfrastructure(_) => "fatal_infrastructure_error",
            Self::Timeout(_) => "timeout_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
