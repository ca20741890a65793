//! Service Framework
//!
//! Common vocabulary for background services:
//! - Service trait driven by a broadcast shutdown signal
//! - Service status reporting

use tokio::sync::broadcast;

// ============================================================================
// Service Trait
// ============================================================================

/// Trait for implementing background services
///
/// Services are long-running tasks that do periodic work until the shutdown
/// signal fires.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Run the service until `shutdown` fires
    async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError>;

    /// Service name for logging and identification
    fn name(&self) -> &'static str;

    /// Current status of the service
    fn status(&self) -> ServiceStatus;
}

// ============================================================================
// Service Status
// ============================================================================

/// Status of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Service is initializing
    Starting,

    /// Service is running normally
    Running,

    /// Service has stopped
    Stopped,

    /// Service failed with an error
    Failed(String),
}

impl ServiceStatus {
    /// Check if the service is in a healthy state
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceStatus::Running)
    }

    /// Check if the service is starting up or running
    pub fn is_active(&self) -> bool {
        matches!(self, ServiceStatus::Starting | ServiceStatus::Running)
    }

    /// Check if the service has stopped (normally or due to failure)
    pub fn is_stopped(&self) -> bool {
        matches!(self, ServiceStatus::Stopped | ServiceStatus::Failed(_))
    }
}

// ============================================================================
// Service Error
// ============================================================================

/// Errors that can occur in services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Service failed during initialization phase
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    /// Attempted to start a service that is already running
    #[error("Service already running")]
    AlreadyRunning,
}
