// src/utils/services.rs

use widestring::U16CString;
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::ERROR_SERVICE_DOES_NOT_EXIST,
        System::Services::{
            ChangeServiceConfigW, CloseServiceHandle, ControlService, OpenSCManagerW,
            OpenServiceW, QueryServiceConfigW, StartServiceW, ENUM_SERVICE_TYPE,
            QUERY_SERVICE_CONFIGW, SC_HANDLE, SC_MANAGER_CONNECT, SERVICE_CHANGE_CONFIG,
            SERVICE_CONTROL_STOP, SERVICE_ERROR, SERVICE_NO_CHANGE, SERVICE_QUERY_CONFIG,
            SERVICE_START, SERVICE_START_TYPE, SERVICE_STATUS, SERVICE_STOP,
        },
    },
};

use crate::errors::ServiceError;
use crate::state::ServiceStartMode;

/// Opens the SCM and the named service, runs `f` on the service handle, and
/// closes both handles regardless of the outcome.
fn with_service<T>(
    service: &str,
    access: u32,
    f: impl FnOnce(SC_HANDLE) -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let wide_name = U16CString::from_str(service)
        .map_err(|_| ServiceError::InvalidName(service.to_string()))?;

    unsafe {
        let scm = OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), SC_MANAGER_CONNECT)
            .map_err(|e| ServiceError::ManagerOpen(format!("{:?}", e)))?;

        let handle = match OpenServiceW(scm, PCWSTR::from_raw(wide_name.as_ptr()), access) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = CloseServiceHandle(scm);
                if e.code() == ERROR_SERVICE_DOES_NOT_EXIST.to_hresult() {
                    return Err(ServiceError::NotFound(service.to_string()));
                }
                return Err(ServiceError::ServiceOpen(
                    service.to_string(),
                    format!("{:?}", e),
                ));
            }
        };

        let result = f(handle);

        let _ = CloseServiceHandle(handle);
        let _ = CloseServiceHandle(scm);
        result
    }
}

/// Queries the configured start mode of a service.
///
/// # Returns
///
/// - `Ok(Some(mode))` for a well-defined start mode.
/// - `Ok(None)` when the service does not exist or reports an unknown mode;
///   such services are not capturable.
/// - `Err(ServiceError)` for SCM access failures.
pub fn query_start_mode(service: &str) -> Result<Option<ServiceStartMode>, ServiceError> {
    let result = with_service(service, SERVICE_QUERY_CONFIG, |handle| {
        let mut needed: u32 = 0;
        // First call sizes the buffer; ERROR_INSUFFICIENT_BUFFER is expected.
        unsafe {
            let _ = QueryServiceConfigW(handle, None, 0, &mut needed);
        }
        if needed == 0 {
            return Err(ServiceError::Query(
                service.to_string(),
                "QueryServiceConfigW returned no buffer size".to_string(),
            ));
        }

        let mut buffer = vec![0u8; needed as usize];
        let config = buffer.as_mut_ptr() as *mut QUERY_SERVICE_CONFIGW;
        unsafe {
            QueryServiceConfigW(handle, Some(config), needed, &mut needed)
                .map_err(|e| ServiceError::Query(service.to_string(), format!("{:?}", e)))?;
            Ok((*config).dwStartType.0)
        }
    });

    match result {
        Ok(raw) => Ok(ServiceStartMode::from_raw(raw)),
        Err(ServiceError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reconfigures only the start mode, leaving every other setting unchanged.
pub fn set_start_mode(service: &str, mode: ServiceStartMode) -> Result<(), ServiceError> {
    with_service(service, SERVICE_CHANGE_CONFIG, |handle| unsafe {
        ChangeServiceConfigW(
            handle,
            ENUM_SERVICE_TYPE(SERVICE_NO_CHANGE),
            SERVICE_START_TYPE(mode.as_raw()),
            SERVICE_ERROR(SERVICE_NO_CHANGE),
            PCWSTR::null(),
            PCWSTR::null(),
            None,
            PCWSTR::null(),
            PCWSTR::null(),
            PCWSTR::null(),
            PCWSTR::null(),
        )
        .map_err(|e| ServiceError::Configure(service.to_string(), format!("{:?}", e)))
    })
}

/// Sends a stop control to the service. An already-stopped service is not an
/// error worth failing a tweak over; callers decide what to do with the result.
pub fn stop_service(service: &str) -> Result<(), ServiceError> {
    with_service(service, SERVICE_STOP, |handle| {
        let mut status = SERVICE_STATUS::default();
        unsafe {
            ControlService(handle, SERVICE_CONTROL_STOP, &mut status)
                .map_err(|e| ServiceError::Control(service.to_string(), format!("{:?}", e)))
        }
    })
}

pub fn start_service(service: &str) -> Result<(), ServiceError> {
    with_service(service, SERVICE_START, |handle| unsafe {
        StartServiceW(handle, None)
            .map_err(|e| ServiceError::Control(service.to_string(), format!("{:?}", e)))
    })
}
