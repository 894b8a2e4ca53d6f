//! Attendance marking, lookup and reporting.
//!
//! Handlers validate nothing themselves: every public method here checks its
//! arguments before the store is touched, and every store call runs under the
//! configured request timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actix_web::rt::time::timeout;

use crate::error::{AppError, AppResult};
use crate::model::employee::EmployeeProfile;
use crate::store::{AttendanceStore, EmployeeDirectory};

pub mod dates;
pub mod reader;
pub mod report;
pub mod writer;

#[derive(Clone)]
pub struct AttendanceService {
    attendance: Arc<dyn AttendanceStore>,
    employees: Arc<dyn EmployeeDirectory>,
    timeout: Duration,
}

impl AttendanceService {
    pub fn new(
        attendance: Arc<dyn AttendanceStore>,
        employees: Arc<dyn EmployeeDirectory>,
        timeout: Duration,
    ) -> Self {
        Self {
            attendance,
            employees,
            timeout,
        }
    }

    /// Awaits a store call, mapping a timeout to `ServiceUnavailable` and
    /// store failures to `Internal`.
    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::Internal(e.context(op))),
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(AppError::ServiceUnavailable)
            }
        }
    }

    /// Resolves an employee reference from a path or body value.
    ///
    /// The human-facing employee code wins; a purely numeric value that
    /// matches no code is tried as the internal id.
    pub async fn resolve_employee(&self, raw: &str) -> AppResult<EmployeeProfile> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::invalid("employeeId is required"));
        }

        let by_code = self
            .guarded("employee lookup", self.employees.find_by_code(raw))
            .await?;
        if let Some(profile) = by_code {
            return Ok(profile);
        }

        if let Ok(id) = raw.parse::<u64>() {
            let by_id = self
                .guarded("employee lookup", self.employees.find_by_id(id))
                .await?;
            if let Some(profile) = by_id {
                return Ok(profile);
            }
        }

        Err(AppError::not_found(format!("Employee '{raw}' not found")))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[actix_web::test]
    async fn resolves_by_code_then_numeric_id() {
        let (svc, _) = service();

        assert_eq!(svc.resolve_employee("E2").await.unwrap().id, 2);
        assert_eq!(svc.resolve_employee(" E3 ").await.unwrap().id, 3);
        assert_eq!(svc.resolve_employee("1").await.unwrap().employee_code, "E1");
        assert_eq!(svc.resolve_employee("1001").await.unwrap().id, 4);
    }

    #[actix_web::test]
    async fn unknown_or_blank_reference_fails() {
        let (svc, _) = service();

        assert!(matches!(svc.resolve_employee("E99").await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.resolve_employee("77").await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.resolve_employee("  ").await, Err(AppError::InvalidArgument(_))));
    }

    #[actix_web::test]
    async fn slow_store_maps_to_service_unavailable() {
        let (svc, _) = service();
        let svc = AttendanceService {
            timeout: Duration::from_millis(10),
            ..svc
        };

        let slow = async {
            actix_web::rt::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, anyhow::Error>(())
        };
        assert!(matches!(
            svc.guarded("slow op", slow).await,
            Err(AppError::ServiceUnavailable)
        ));
    }

    #[actix_web::test]
    async fn store_errors_become_internal() {
        let (svc, _) = service();
        let failing = async { Err::<(), _>(anyhow::anyhow!("connection reset")) };
        assert!(matches!(
            svc.guarded("failing op", failing).await,
            Err(AppError::Internal(_))
        ));
    }
}
