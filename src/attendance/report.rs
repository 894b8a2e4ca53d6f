use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use super::AttendanceService;
use super::dates::{DateWindow, month_window};
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceStatus, AttendanceView};

pub const DEFAULT_REPORT_LIMIT: i64 = 5;
pub const MAX_REPORT_LIMIT: i64 = 100;

/// Record-level pagination; applied before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub skip: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, skip: Option<i64>) -> AppResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_REPORT_LIMIT);
        let skip = skip.unwrap_or(0);

        if !(1..=MAX_REPORT_LIMIT).contains(&limit) {
            return Err(AppError::invalid(format!(
                "limit must be between 1 and {MAX_REPORT_LIMIT}"
            )));
        }
        if skip < 0 {
            return Err(AppError::invalid("skip must not be negative"));
        }

        Ok(Self { limit, skip })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    /// Human-facing employee id.
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,
    pub status: AttendanceStatus,
}

impl From<&AttendanceView> for ReportEntry {
    fn from(v: &AttendanceView) -> Self {
        Self {
            employee_id: v.employee_code.clone(),
            employee_name: v.employee_name.clone(),
            department_name: v.department_name.clone(),
            status: v.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub records: Vec<ReportEntry>,
}

/// Report groups in date-descending order. Serialises as a JSON object keyed
/// by `YYYY-MM-DD`, keys written in that same order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedReport {
    pub days: Vec<DayGroup>,
}

impl GroupedReport {
    pub fn record_count(&self) -> usize {
        self.days.iter().map(|g| g.records.len()).sum()
    }
}

impl Serialize for GroupedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for group in &self.days {
            map.serialize_entry(&group.date.format("%Y-%m-%d").to_string(), &group.records)?;
        }
        map.end()
    }
}

/// Groups an already sorted and paginated page by its date key.
///
/// Input order is kept inside each group; groups come out date descending.
pub fn group_by_day(rows: &[AttendanceView]) -> GroupedReport {
    let mut days: Vec<DayGroup> = Vec::new();

    for row in rows {
        match days.iter_mut().find(|g| g.date == row.date) {
            Some(group) => group.records.push(row.into()),
            None => days.push(DayGroup {
                date: row.date,
                records: vec![row.into()],
            }),
        }
    }

    days.sort_by(|a, b| b.date.cmp(&a.date));
    GroupedReport { days }
}

/// Count per status; statuses missing from the data stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub present: i64,
    pub absent: i64,
    pub sick: i64,
    pub leave: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus, n: i64) {
        match status {
            AttendanceStatus::Present => self.present += n,
            AttendanceStatus::Absent => self.absent += n,
            AttendanceStatus::Sick => self.sick += n,
            AttendanceStatus::Leave => self.leave += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.present + self.absent + self.sick + self.leave
    }

    /// Folds raw `(status, count)` aggregation rows, merging spellings that
    /// differ only in case. Rows with unrecognised statuses are skipped.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut counts = Self::default();
        for (raw, n) in rows {
            match AttendanceStatus::parse(raw.as_ref()) {
                Ok(status) => counts.add(status, n),
                Err(_) => {
                    tracing::warn!(status = raw.as_ref(), count = n, "Skipping unknown attendance status");
                }
            }
        }
        counts
    }
}

impl AttendanceService {
    /// Paginated report grouped by day. `page` selects records first; the
    /// selected records are then grouped.
    pub async fn report(&self, day: Option<NaiveDate>, page: Page) -> AppResult<GroupedReport> {
        let rows = self
            .guarded("attendance report", self.attendance.list_page(day, page))
            .await?;
        let report = group_by_day(&rows);
        tracing::debug!(
            days = report.days.len(),
            records = report.record_count(),
            limit = page.limit,
            skip = page.skip,
            "Attendance report built"
        );
        Ok(report)
    }

    pub async fn monthly_summary(&self, month: u32, year: i32) -> AppResult<StatusCounts> {
        let window = month_window(month, year)?;
        self.window_summary(window).await
    }

    /// Status counts of every employee inside `window`.
    pub async fn window_summary(&self, window: DateWindow) -> AppResult<StatusCounts> {
        let rows = self
            .guarded("attendance summary", self.attendance.count_by_status(None, Some(window)))
            .await?;
        let counts = StatusCounts::from_rows(rows);
        tracing::debug!(from = %window.start, to = %window.end, total = counts.total(), "Attendance summary");
        Ok(counts)
    }

    /// All-time counts for one resolved employee unless `window` narrows them.
    pub async fn employee_totals(
        &self,
        employee_id: u64,
        window: Option<DateWindow>,
    ) -> AppResult<StatusCounts> {
        let rows = self
            .guarded(
                "employee attendance totals",
                self.attendance.count_by_status(Some(employee_id), window),
            )
            .await?;
        Ok(StatusCounts::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::service;
    use super::*;
    use chrono::{TimeZone, Utc};

    fn view(id: u64, code: &str, date: &str, status: AttendanceStatus) -> AttendanceView {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        AttendanceView {
            id,
            employee_id: id,
            employee_code: code.to_string(),
            employee_name: format!("Name {code}"),
            department_name: Some("Ops".to_string()),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            status,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(Page::new(None, None).unwrap(), Page { limit: 5, skip: 0 });
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(Some(101), None).is_err());
        assert!(Page::new(Some(5), Some(-1)).is_err());
        assert_eq!(Page::new(Some(100), Some(40)).unwrap(), Page { limit: 100, skip: 40 });
    }

    #[test]
    fn groups_page_by_date_descending() {
        let rows = vec![
            view(1, "E1", "2024-03-06", AttendanceStatus::Present),
            view(2, "E2", "2024-03-06", AttendanceStatus::Absent),
            view(3, "E1", "2024-03-05", AttendanceStatus::Sick),
        ];

        let report = group_by_day(&rows);
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[0].date.to_string(), "2024-03-06");
        assert_eq!(report.days[0].records.len(), 2);
        assert_eq!(report.days[0].records[1].employee_id, "E2");
        assert_eq!(report.days[1].records[0].status, AttendanceStatus::Sick);
        assert_eq!(report.record_count(), 3);
    }

    #[test]
    fn serialises_as_object_keyed_by_day() {
        let rows = vec![
            view(1, "E1", "2024-03-06", AttendanceStatus::Present),
            view(2, "E2", "2024-03-05", AttendanceStatus::Leave),
        ];
        let json = serde_json::to_string(&group_by_day(&rows)).unwrap();

        let newer = json.find("\"2024-03-06\"").unwrap();
        let older = json.find("\"2024-03-05\"").unwrap();
        assert!(newer < older, "keys must be written newest first: {json}");
        assert!(json.contains("\"employeeName\":\"Name E1\""));
        assert!(json.contains("\"departmentName\":\"Ops\""));
        assert!(json.contains("\"status\":\"Leave\""));
    }

    #[test]
    fn empty_page_is_empty_object() {
        let report = group_by_day(&[]);
        assert_eq!(serde_json::to_string(&report).unwrap(), "{}");
    }

    #[test]
    fn counts_default_to_zero_and_merge_case_variants() {
        let counts = StatusCounts::from_rows(vec![
            ("Present".to_string(), 3),
            ("present".to_string(), 2),
            ("ABSENT".to_string(), 1),
            ("Holiday".to_string(), 7),
        ]);

        assert_eq!(counts.present, 5);
        assert_eq!(counts.absent, 1);
        assert_eq!(counts.sick, 0);
        assert_eq!(counts.leave, 0);
        assert_eq!(counts.total(), 6);

        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json, serde_json::json!({"present": 5, "absent": 1, "sick": 0, "leave": 0}));
    }

    async fn seed_two_days(svc: &AttendanceService) {
        for (emp, status) in [("E1", "Present"), ("E2", "Absent"), ("E3", "Sick"), ("1001", "Leave")] {
            svc.mark(emp, Some("2024-03-05"), status).await.unwrap();
        }
        for (emp, status) in [("E1", "Present"), ("E2", "Present"), ("E3", "Leave")] {
            svc.mark(emp, Some("2024-03-06"), status).await.unwrap();
        }
    }

    #[actix_web::test]
    async fn report_pages_records_before_grouping() {
        let (svc, _) = service();
        seed_two_days(&svc).await;

        let report = svc.report(None, Page::new(Some(5), Some(0)).unwrap()).await.unwrap();
        assert_eq!(report.record_count(), 5);
        assert_eq!(report.days.len(), 2);
        assert!(report.days[0].date > report.days[1].date);
        // The newer day holds 3 records, so only 2 of the older day fit.
        assert_eq!(report.days[0].records.len(), 3);
        assert_eq!(report.days[1].records.len(), 2);

        let rest = svc.report(None, Page::new(Some(5), Some(5)).unwrap()).await.unwrap();
        assert_eq!(rest.record_count(), 2);
        assert_eq!(rest.days.len(), 1);
        assert_eq!(rest.days[0].date.to_string(), "2024-03-05");
    }

    #[actix_web::test]
    async fn report_filters_by_day() {
        let (svc, _) = service();
        seed_two_days(&svc).await;

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let report = svc.report(Some(day), Page::new(Some(100), None).unwrap()).await.unwrap();
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.record_count(), 4);

        let empty = svc
            .report(NaiveDate::from_ymd_opt(2020, 1, 1), Page::new(None, None).unwrap())
            .await
            .unwrap();
        assert!(empty.days.is_empty());
    }

    #[actix_web::test]
    async fn monthly_summary_counts_sum_to_window_records() {
        let (svc, store) = service();
        seed_two_days(&svc).await;
        svc.mark("E1", Some("2024-04-01"), "Absent").await.unwrap();

        let summary = svc.monthly_summary(3, 2024).await.unwrap();
        assert_eq!(summary, StatusCounts { present: 3, absent: 1, sick: 1, leave: 2 });
        assert_eq!(summary.total(), 7);
        assert_eq!(store.records().len(), 8);

        let april = svc.monthly_summary(4, 2024).await.unwrap();
        assert_eq!(april, StatusCounts { present: 0, absent: 1, sick: 0, leave: 0 });
    }

    #[actix_web::test]
    async fn monthly_summary_of_empty_month_is_all_zero() {
        let (svc, _) = service();
        assert_eq!(svc.monthly_summary(7, 2025).await.unwrap(), StatusCounts::default());
        assert!(matches!(svc.monthly_summary(13, 2025).await, Err(AppError::InvalidArgument(_))));
    }

    #[actix_web::test]
    async fn employee_totals_are_all_time_unless_windowed() {
        let (svc, _) = service();
        seed_two_days(&svc).await;
        svc.mark("E3", Some("2023-12-31"), "Sick").await.unwrap();

        let e3 = svc.resolve_employee("E3").await.unwrap();
        let totals = svc.employee_totals(e3.id, None).await.unwrap();
        assert_eq!(totals, StatusCounts { present: 0, absent: 0, sick: 2, leave: 1 });

        let window = month_window(3, 2024).unwrap();
        let march = svc.employee_totals(e3.id, Some(window)).await.unwrap();
        assert_eq!(march, StatusCounts { present: 0, absent: 0, sick: 1, leave: 1 });

        assert!(matches!(svc.resolve_employee("E9").await, Err(AppError::NotFound(_))));
    }
}
