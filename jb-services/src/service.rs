//! Service trait and lifecycle states.
//!
//! Long-lived components implement `Service` so front ends can start them,
//! stop them and ask whether they are healthy in one uniform way.

use jb_core::error::JbResult;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Created but not initialized.
    Created,
    /// Running and ready.
    Running,
    /// Stopped after a shutdown.
    Stopped,
    /// Initialization failed.
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Standard lifecycle and health-checking interface.
pub trait Service: Send + Sync {
    /// Human-readable name of this service.
    fn name(&self) -> &str;

    /// Current state of this service.
    fn state(&self) -> ServiceState;

    /// Initialize the service. Called once during startup.
    fn init(&mut self) -> JbResult<()>;

    /// Shut the service down.
    fn shutdown(&mut self) -> JbResult<()>;

    /// Returns true if the service is operational.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jb_core::error::JbError;

    struct Flaky {
        state: ServiceState,
        fail: bool,
    }

    impl Service for Flaky {
        fn name(&self) -> &str { "flaky" }
        fn state(&self) -> ServiceState { self.state }
        fn init(&mut self) -> JbResult<()> {
            if self.fail {
                self.state = ServiceState::Failed;
                return Err(JbError::Internal("boom".into()));
            }
            self.state = ServiceState::Running;
            Ok(())
        }
        fn shutdown(&mut self) -> JbResult<()> {
            self.state = ServiceState::Stopped;
            Ok(())
        }
    }

    #[test]
    fn test_service_lifecycle() {
        let mut svc = Flaky { state: ServiceState::Created, fail: false };
        assert!(!svc.is_healthy());
        svc.init().unwrap();
        assert!(svc.is_healthy());
        svc.shutdown().unwrap();
        assert!(!svc.is_healthy());
        assert_eq!(svc.state().to_string(), "stopped");
    }

    #[test]
    fn test_failed_init_is_unhealthy() {
        let mut svc = Flaky { state: ServiceState::Created, fail: true };
        assert!(svc.init().is_err());
        assert_eq!(svc.state(), ServiceState::Failed);
        assert!(!svc.is_healthy());
    }
}
