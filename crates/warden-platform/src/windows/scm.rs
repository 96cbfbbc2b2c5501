//! Service Control Manager access via `windows-service`.

use std::ffi::{OsStr, OsString};

use windows_service::service::{
    Service, ServiceAccess, ServiceAction, ServiceActionType, ServiceErrorControl,
    ServiceFailureActions, ServiceFailureResetPeriod, ServiceInfo, ServiceStartType, ServiceState,
    ServiceType,
};
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

use warden_core::{
    EntryAccess, FailureRecoveryPolicy, OsError, OsResult, ServiceBackend, ServiceDescriptor,
    ServiceEntry, ServiceRuntimeState, ServiceStatus,
};

fn os_error(err: windows_service::Error) -> OsError {
    match err {
        windows_service::Error::Winapi(io) => OsError::from_io(&io),
        _ => OsError::INVALID_PARAMETER,
    }
}

fn manager(access: ServiceManagerAccess) -> OsResult<ServiceManager> {
    ServiceManager::local_computer(None::<&str>, access).map_err(os_error)
}

fn service_access(access: EntryAccess) -> ServiceAccess {
    let mut mapped = ServiceAccess::empty();
    if access.contains(EntryAccess::QUERY) {
        mapped |= ServiceAccess::QUERY_STATUS;
    }
    if access.contains(EntryAccess::START) {
        mapped |= ServiceAccess::START;
    }
    if access.contains(EntryAccess::STOP) {
        mapped |= ServiceAccess::STOP;
    }
    if access.contains(EntryAccess::CONFIGURE) {
        mapped |= ServiceAccess::CHANGE_CONFIG;
    }
    if access.contains(EntryAccess::DELETE) {
        mapped |= ServiceAccess::DELETE;
    }
    mapped
}

const fn runtime_state(state: ServiceState) -> ServiceRuntimeState {
    match state {
        ServiceState::Stopped => ServiceRuntimeState::Stopped,
        ServiceState::StartPending => ServiceRuntimeState::StartPending,
        ServiceState::StopPending => ServiceRuntimeState::StopPending,
        ServiceState::Running => ServiceRuntimeState::Running,
        ServiceState::ContinuePending => ServiceRuntimeState::ContinuePending,
        ServiceState::PausePending => ServiceRuntimeState::PausePending,
        ServiceState::Paused => ServiceRuntimeState::Paused,
    }
}

fn status(raw: &windows_service::service::ServiceStatus) -> ServiceStatus {
    ServiceStatus {
        state: runtime_state(raw.current_state),
        wait_hint: raw.wait_hint,
        checkpoint: raw.checkpoint,
    }
}

/// The local Service Control Manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceControlManager;

impl ServiceBackend for ServiceControlManager {
    fn create(&self, descriptor: &ServiceDescriptor) -> OsResult<Box<dyn ServiceEntry>> {
        let scm = manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;
        let info = ServiceInfo {
            name: OsString::from(&descriptor.name),
            display_name: OsString::from(descriptor.effective_display_name()),
            service_type: ServiceType::OWN_PROCESS,
            start_type: ServiceStartType::AutoStart,
            error_control: ServiceErrorControl::Normal,
            executable_path: descriptor.binary_path.clone(),
            launch_arguments: Vec::new(),
            dependencies: Vec::new(),
            account_name: None,
            account_password: None,
        };
        let service = scm
            .create_service(&info, service_access(EntryAccess::all()))
            .map_err(os_error)?;
        Ok(Box::new(ScmEntry(service)))
    }

    fn open(&self, name: &str, access: EntryAccess) -> OsResult<Box<dyn ServiceEntry>> {
        let scm = manager(ServiceManagerAccess::CONNECT)?;
        let service = scm
            .open_service(name, service_access(access))
            .map_err(os_error)?;
        Ok(Box::new(ScmEntry(service)))
    }
}

struct ScmEntry(Service);

impl ServiceEntry for ScmEntry {
    fn set_description(&self, description: &str) -> OsResult<()> {
        self.0.set_description(description).map_err(os_error)
    }

    fn set_failure_policy(&self, policy: &FailureRecoveryPolicy) -> OsResult<()> {
        let restarts = (0..policy.restart_attempts)
            .map(|_| ServiceAction {
                action_type: ServiceActionType::Restart,
                delay: policy.restart_delay,
            })
            .collect();
        let actions = ServiceFailureActions {
            reset_period: ServiceFailureResetPeriod::After(policy.reset_period),
            reboot_msg: None,
            command: None,
            actions: Some(restarts),
        };
        self.0.update_failure_actions(actions).map_err(os_error)
    }

    fn start(&self) -> OsResult<()> {
        self.0.start(&[] as &[&OsStr]).map_err(os_error)
    }

    fn stop(&self) -> OsResult<ServiceStatus> {
        self.0.stop().map(|raw| status(&raw)).map_err(os_error)
    }

    fn query_status(&self) -> OsResult<ServiceStatus> {
        self.0.query_status().map(|raw| status(&raw)).map_err(os_error)
    }

    fn delete(&self) -> OsResult<()> {
        self.0.delete().map_err(os_error)
    }
}
