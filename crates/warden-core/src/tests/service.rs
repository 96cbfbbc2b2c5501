//! Service lifecycle scenarios.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PollPolicy;
use crate::error::{OsError, OsOperation, WardenError};
use crate::service::ServiceLifecycleController;
use crate::tests::mocks::{FakeServiceBackend, ServiceCall};
use crate::types::{FailureRecoveryPolicy, Outcome, ServiceDescriptor, ServiceRuntimeState};

const SERVICE: &str = "P4VFS.Service";

fn setup(backend: FakeServiceBackend) -> (ServiceLifecycleController, FakeServiceBackend) {
    let controller = ServiceLifecycleController::new(Arc::new(backend.clone()))
        .with_poll_policy(PollPolicy::fixed(Duration::from_millis(5)))
        .with_default_timeout(Duration::from_secs(5));
    (controller, backend)
}

fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(SERVICE, r"C:\Program Files\P4VFS\P4VFS.Service.exe")
        .with_display_name("P4VFS Service")
        .with_description("Virtual file system service")
}

#[test]
fn install_start_uninstall_end_to_end() {
    let (controller, backend) = setup(FakeServiceBackend::new());

    assert_eq!(controller.install(&descriptor()).unwrap(), Outcome::Applied);
    let service = backend.service(SERVICE).unwrap();
    assert_eq!(service.description.as_deref(), Some("Virtual file system service"));
    assert_eq!(service.failure_policy, Some(FailureRecoveryPolicy::STANDARD));

    assert_eq!(controller.start(SERVICE, Duration::from_secs(5)).unwrap(), Outcome::Applied);
    assert_eq!(controller.query_state(SERVICE), Some(ServiceRuntimeState::Running));
    assert!(controller.is_running(SERVICE));

    assert_eq!(controller.uninstall(SERVICE, false).unwrap(), Outcome::Applied);
    assert!(backend.service(SERVICE).is_none());
    assert_eq!(controller.query_state(SERVICE), None);

    assert_eq!(
        controller.uninstall(SERVICE, false).unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(backend.deletes(), 1);
}

#[test]
fn install_over_existing_entry_reuses_it() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(0));
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert_eq!(controller.install(&descriptor()).unwrap(), Outcome::Applied);
    assert_eq!(backend.creates(), 1);
    assert_eq!(backend.opens(), 1);
    assert_eq!(backend.starts(), 1);
    assert_eq!(backend.state_of(SERVICE), Some(ServiceRuntimeState::Running));
}

#[test]
fn install_reports_each_configuration_step() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.fail(ServiceCall::SetFailurePolicy, OsError::ACCESS_DENIED);

    let err = controller.install(&descriptor()).unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::SetFailureActions,
            source: OsError::ACCESS_DENIED
        }
    ));
    assert_eq!(backend.starts(), 0);

    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.fail(ServiceCall::SetDescription, OsError::INVALID_PARAMETER);
    let err = controller.install(&descriptor()).unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::SetDescription,
            ..
        }
    ));

    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.fail(ServiceCall::Create, OsError::ACCESS_DENIED);
    let err = controller.install(&descriptor()).unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::CreateService,
            ..
        }
    ));
}

#[test]
fn install_rejects_invalid_descriptor() {
    let (controller, backend) = setup(FakeServiceBackend::new());

    assert!(controller
        .install(&ServiceDescriptor::new(" ", "svc.exe"))
        .unwrap_err()
        .is_invalid_argument());
    assert!(controller
        .install(&ServiceDescriptor::new(SERVICE, ""))
        .unwrap_err()
        .is_invalid_argument());
    assert_eq!(backend.creates(), 0);
}

#[test]
fn start_running_service_issues_no_request() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert_eq!(
        controller.start(SERVICE, Duration::from_secs(1)).unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(backend.starts(), 0);
}

#[test]
fn stop_stopped_service_issues_no_request() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Stopped);

    assert_eq!(
        controller.stop(SERVICE, Duration::from_secs(1)).unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(backend.stops(), 0);
}

#[test]
fn start_joins_a_start_already_in_flight() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(3));
    backend.seed(SERVICE, ServiceRuntimeState::StartPending);

    assert_eq!(controller.start(SERVICE, Duration::from_secs(5)).unwrap(), Outcome::Applied);
    assert_eq!(backend.starts(), 1);
    assert_eq!(backend.state_of(SERVICE), Some(ServiceRuntimeState::Running));
}

#[test]
fn stop_answered_not_active_is_already_stopped() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Running);
    backend.fail(ServiceCall::Stop, OsError::SERVICE_NOT_ACTIVE);

    assert_eq!(
        controller.stop(SERVICE, Duration::from_secs(1)).unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(backend.stops(), 1);
}

#[test]
fn start_with_zero_timeout_is_pending() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(3));
    backend.seed(SERVICE, ServiceRuntimeState::Stopped);

    let started = Instant::now();
    let err = controller.start(SERVICE, Duration::ZERO).unwrap_err();
    assert!(err.is_pending());
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(backend.starts(), 1);
    assert_eq!(backend.state_of(SERVICE), Some(ServiceRuntimeState::StartPending));
}

#[test]
fn stop_with_zero_timeout_is_pending() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(3));
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    let err = controller.stop(SERVICE, Duration::ZERO).unwrap_err();
    assert!(err.is_pending());
    assert_eq!(backend.stops(), 1);
}

#[test]
fn stop_that_completes_immediately_does_not_poll() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(0));
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert_eq!(controller.stop(SERVICE, Duration::from_secs(1)).unwrap(), Outcome::Applied);
    assert_eq!(backend.queries(), 1);
}

#[test]
fn stop_waits_for_stopped() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(3));
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert_eq!(controller.stop(SERVICE, Duration::from_secs(5)).unwrap(), Outcome::Applied);
    assert_eq!(backend.state_of(SERVICE), Some(ServiceRuntimeState::Stopped));
}

#[test]
fn start_times_out_on_a_stuck_service() {
    let backend = FakeServiceBackend::new().stuck();
    let controller = ServiceLifecycleController::new(Arc::new(backend.clone()));
    backend.seed(SERVICE, ServiceRuntimeState::Stopped);

    let started = Instant::now();
    let err = controller.start(SERVICE, Duration::from_millis(200)).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, WardenError::Timeout(t) if t == Duration::from_millis(200)));
    assert!(elapsed >= Duration::from_millis(200), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "returned after {elapsed:?}");
}

#[test]
fn start_missing_service_is_not_found() {
    let (controller, backend) = setup(FakeServiceBackend::new());

    assert!(controller.start(SERVICE, Duration::from_secs(1)).unwrap_err().is_not_found());
    assert!(controller.stop(SERVICE, Duration::from_secs(1)).unwrap_err().is_not_found());
    assert!(controller.query_status(SERVICE).unwrap_err().is_not_found());
    assert_eq!(backend.starts(), 0);
}

#[test]
fn start_failure_is_surfaced() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Stopped);
    backend.fail(ServiceCall::Start, OsError::ACCESS_DENIED);

    let err = controller.start(SERVICE, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::StartService,
            source: OsError::ACCESS_DENIED
        }
    ));
}

#[test]
fn uninstall_keep_entry_only_stops() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert_eq!(controller.uninstall(SERVICE, true).unwrap(), Outcome::Applied);
    assert_eq!(backend.state_of(SERVICE), Some(ServiceRuntimeState::Stopped));
    assert_eq!(backend.deletes(), 0);
}

#[test]
fn uninstall_waits_out_a_pending_stop() {
    let (controller, backend) = setup(FakeServiceBackend::new().settle_polls(2));
    backend.seed(SERVICE, ServiceRuntimeState::StopPending);

    assert_eq!(controller.uninstall(SERVICE, false).unwrap(), Outcome::Applied);
    assert_eq!(backend.stops(), 0);
    assert_eq!(backend.deletes(), 1);
}

#[test]
fn uninstall_surfaces_open_failures_other_than_absence() {
    let (controller, backend) = setup(FakeServiceBackend::new());
    backend.seed(SERVICE, ServiceRuntimeState::Stopped);
    backend.fail(ServiceCall::Open, OsError::ACCESS_DENIED);

    let err = controller.uninstall(SERVICE, false).unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::OpenService,
            ..
        }
    ));
}

#[test]
fn uninstall_stuck_service_times_out() {
    let backend = FakeServiceBackend::new().stuck();
    let controller = ServiceLifecycleController::new(Arc::new(backend.clone()))
        .with_poll_policy(PollPolicy::fixed(Duration::from_millis(5)))
        .with_default_timeout(Duration::from_millis(50));
    backend.seed(SERVICE, ServiceRuntimeState::Running);

    assert!(controller.uninstall(SERVICE, false).unwrap_err().is_timeout());
    assert_eq!(backend.deletes(), 0);
}

#[test]
fn query_state_never_fails() {
    let (controller, backend) = setup(FakeServiceBackend::new());

    assert_eq!(controller.query_state(""), None);
    assert_eq!(controller.query_state(SERVICE), None);

    backend.seed(SERVICE, ServiceRuntimeState::Paused);
    assert_eq!(controller.query_state(SERVICE), Some(ServiceRuntimeState::Paused));

    backend.fail(ServiceCall::Query, OsError::ACCESS_DENIED);
    assert_eq!(controller.query_state(SERVICE), None);
    assert!(!controller.is_running(SERVICE));
}

#[test]
fn empty_names_are_rejected_before_any_call() {
    let (controller, backend) = setup(FakeServiceBackend::new());

    assert!(controller.start("", Duration::ZERO).unwrap_err().is_invalid_argument());
    assert!(controller.stop(" ", Duration::ZERO).unwrap_err().is_invalid_argument());
    assert!(controller.uninstall("\t", false).unwrap_err().is_invalid_argument());
    assert!(controller.query_status("").unwrap_err().is_invalid_argument());
    assert_eq!(backend.opens(), 0);
}
