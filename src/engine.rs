//! Pure job lifecycle engine: amount computation, the
//! active -> finished/cancelled -> paid state machine, and the derived-value
//! bookkeeping that keeps money figures consistent across edits.
//!
//! Nothing in this module performs I/O. Every operation takes the data it
//! needs as parameters and returns a [`JobPatch`] for the adapter to persist.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::{Job, JobDraft, JobPatch, JobStatus, PaymentMethod, PaymentState, SERVICE_TYPES};
use crate::pricing::{self, PriceTable};

/// Hours included in the base price; time beyond it is surcharged.
pub const INCLUDED_HOURS: f64 = 3.0;
/// Surcharge per hour beyond the included window.
pub const EXTRA_HOUR_RATE: f64 = 30.0;
/// Kilometres included in the base price.
pub const INCLUDED_KM: f64 = 50.0;
/// Surcharge per km beyond the included allowance.
pub const EXTRA_KM_RATE: f64 = 1.0;
/// Below this elapsed wall time, finishing requires the operator to say
/// whether the dispatch was genuine or should be voided.
pub const SHORT_JOB_MINUTES: i64 = 10;

/// Engine error kinds. Pricing misses are not errors; they resolve silently.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required field is missing or unparseable; the operation is aborted
    /// and the job left unchanged.
    #[error("validation: {0}")]
    Validation(String),
    /// The referenced job is no longer in the local snapshot.
    #[error("job not found: {0}")]
    NotFound(String),
}

/// Resolve a job id against the current snapshot.
pub fn find_job<'a>(jobs: &'a [Job], id: &str) -> Result<&'a Job, EngineError> {
    jobs.iter()
        .find(|j| j.id == id)
        .ok_or_else(|| EngineError::NotFound(id.to_string()))
}

/// Round to two decimals, the precision of every money field.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// The triple produced by [`compute_amount`]. Surcharges are reported
/// separately from the total for display and audit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Billing {
    pub amount: f64,
    pub extra_hour_cost: f64,
    pub extra_km_cost: f64,
}

/// Surcharge for elapsed hours beyond the included window.
pub fn extra_hour_cost(elapsed_hours: f64) -> f64 {
    round2((elapsed_hours - INCLUDED_HOURS).max(0.0) * EXTRA_HOUR_RATE)
}

/// Surcharge for distance beyond the included allowance.
pub fn extra_km_cost(distance_km: f64) -> f64 {
    round2((distance_km - INCLUDED_KM).max(0.0) * EXTRA_KM_RATE)
}

/// Compute the billable amount for a job snapshot.
///
/// Cancelled jobs always bill zero. Both surcharge fields are written back
/// onto the snapshot even when computing only for preview, so callers always
/// see the same breakdown the total was derived from.
pub fn compute_amount(table: &PriceTable, job: &mut Job) -> Billing {
    if job.status == JobStatus::Cancelled {
        job.extra_hour_cost = 0.0;
        job.extra_km_cost = 0.0;
        return Billing {
            amount: 0.0,
            extra_hour_cost: 0.0,
            extra_km_cost: 0.0,
        };
    }

    let base = pricing::resolve_price(table, &job.client, &job.service_type);
    let hours = extra_hour_cost(job.elapsed_hours.unwrap_or(0.0));
    let km = extra_km_cost(job.distance_km);
    job.extra_hour_cost = hours;
    job.extra_km_cost = km;

    // Clamp so the distance surcharge survives even if the hour term were
    // ever negative; with non-negative surcharges this is base + hours + km.
    let amount = round2((base + hours + km).max(base + km));
    Billing {
        amount,
        extra_hour_cost: hours,
        extra_km_cost: km,
    }
}

/// Parse a `YYYY-MM-DD` + `HH:MM` pair into an instant.
pub fn parse_instant(date: &str, time: &str) -> Result<NaiveDateTime, EngineError> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("invalid date: {date}")))?;
    let t = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| EngineError::Validation(format!("invalid time: {time}")))?;
    Ok(d.and_time(t))
}

/// Elapsed hours between two instants, clamped at zero, two decimals.
/// Computed from whole seconds so sub-minute time is not discarded.
pub fn elapsed_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let secs = (end - start).num_seconds().max(0);
    round2(secs as f64 / 3600.0)
}

/// Interpret the operator's arrival km input.
///
/// With an initial odometer on record the input is an absolute reading and
/// the distance is the non-negative difference; otherwise the input is the
/// distance itself. Returns `(distance_km, final_km)`.
pub fn distance_driven(initial_km: Option<f64>, input: f64) -> (f64, Option<f64>) {
    match initial_km {
        Some(initial) => ((input - initial).max(0.0), Some(input)),
        None => (input, None),
    }
}

/// Derived end-of-job values awaiting the operator's confirmation.
///
/// Finishing is a suspension point: the engine never transitions a job on
/// its own. The caller shows the draft, collects a [`FinishDecision`]
/// (or aborts, leaving the job active) and only then settles.
#[derive(Clone, Debug)]
pub struct FinishDraft {
    pub end_date: String,
    pub end_time: String,
    pub elapsed_hours: f64,
    pub elapsed_minutes: i64,
    pub distance_km: f64,
    pub final_km: Option<f64>,
}

impl FinishDraft {
    /// Whether the short-duration guard applies and the operator must
    /// disambiguate between a genuine short job and a voided dispatch.
    pub fn is_short(&self) -> bool {
        self.elapsed_minutes < SHORT_JOB_MINUTES
    }
}

/// The operator's answer when confirming a finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishDecision {
    /// Real service: finish and bill normally.
    Genuine,
    /// Erroneous dispatch: cancel with amount zero.
    Void,
}

/// Derive the end-of-job values for finishing `job` now.
pub fn prepare_finish(
    job: &Job,
    now: NaiveDateTime,
    km_input: f64,
) -> Result<FinishDraft, EngineError> {
    let start = parse_instant(&job.start_date, &job.start_time)?;
    let elapsed_minutes = (now - start).num_minutes().max(0);
    let (distance_km, final_km) = distance_driven(job.initial_km, km_input);

    Ok(FinishDraft {
        end_date: now.format("%Y-%m-%d").to_string(),
        end_time: now.format("%H:%M").to_string(),
        elapsed_hours: elapsed_hours(start, now),
        elapsed_minutes,
        distance_km,
        final_km,
    })
}

/// Settle a confirmed finish into a persistable patch.
///
/// Entering either terminal state computes and records the amount, both
/// surcharges, the distance and the end timestamps in one shot.
pub fn settle_finish(
    table: &PriceTable,
    job: &Job,
    draft: &FinishDraft,
    decision: FinishDecision,
) -> JobPatch {
    let status = match decision {
        FinishDecision::Genuine => JobStatus::Finished,
        FinishDecision::Void => JobStatus::Cancelled,
    };

    let mut snapshot = job.clone();
    snapshot.status = status;
    snapshot.end_date = Some(draft.end_date.clone());
    snapshot.end_time = Some(draft.end_time.clone());
    snapshot.elapsed_hours = Some(draft.elapsed_hours);
    snapshot.distance_km = draft.distance_km;
    snapshot.final_km = draft.final_km;
    let billing = compute_amount(table, &mut snapshot);

    JobPatch {
        end_date: Some(draft.end_date.clone()),
        end_time: Some(draft.end_time.clone()),
        elapsed_hours: Some(draft.elapsed_hours),
        distance_km: Some(draft.distance_km),
        final_km: Some(draft.final_km),
        amount: Some(billing.amount),
        extra_hour_cost: Some(billing.extra_hour_cost),
        extra_km_cost: Some(billing.extra_km_cost),
        status: Some(status),
        ..JobPatch::default()
    }
}

/// Flip a job's payment state. Valid for any status; callers filter.
pub fn toggle_payment(job: &Job) -> JobPatch {
    JobPatch {
        payment_state: Some(job.payment_state.flipped()),
        ..JobPatch::default()
    }
}

/// Check the required fields of a form draft.
pub fn validate_draft(draft: &JobDraft) -> Result<(), EngineError> {
    if draft.client.trim().is_empty() {
        return Err(EngineError::Validation("client is required".into()));
    }
    if !SERVICE_TYPES.contains(&draft.service_type.as_str()) {
        return Err(EngineError::Validation(format!(
            "unknown service type: {}",
            draft.service_type
        )));
    }
    parse_instant(&draft.start_date, &draft.start_time)?;
    if draft.payment_method == PaymentMethod::OnTerms && draft.due_date.trim().is_empty() {
        return Err(EngineError::Validation(
            "due date is required for on-terms payment".into(),
        ));
    }
    Ok(())
}

fn parse_num(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', ".");
    s.parse::<f64>().ok()
}

/// Build a new active job from a validated draft.
pub fn new_job(
    draft: &JobDraft,
    uid: &str,
    email: &str,
    created_at: String,
) -> Result<Job, EngineError> {
    validate_draft(draft)?;

    Ok(Job {
        id: Uuid::new_v4().to_string(),
        uid: uid.to_string(),
        email: email.to_string(),
        client: draft.client.trim().to_string(),
        service_type: draft.service_type.clone(),
        plate: draft.plate.trim().to_uppercase(),
        model: draft.model.trim().to_string(),
        start_date: draft.start_date.clone(),
        start_time: draft.start_time.clone(),
        end_date: None,
        end_time: None,
        elapsed_hours: None,
        initial_km: parse_num(&draft.initial_km),
        final_km: None,
        distance_km: 0.0,
        extra_costs: parse_num(&draft.extra_costs).unwrap_or(0.0),
        amount: None,
        extra_hour_cost: 0.0,
        extra_km_cost: 0.0,
        payment_method: draft.payment_method,
        payment_state: PaymentState::Pending,
        due_date: match draft.payment_method {
            PaymentMethod::OnTerms => Some(draft.due_date.trim().to_string()),
            PaymentMethod::Immediate => None,
        },
        status: JobStatus::Active,
        note: draft.note.clone(),
        created_at,
    })
}

/// Apply a full edit to an existing job.
///
/// Classification, timing, distance and note fields are overwritten
/// unconditionally. When the draft supplies both an end date and an end
/// time, elapsed hours, distance and all money figures are recomputed from
/// the edited inputs; otherwise the previously computed figures are left
/// untouched. Re-applying identical inputs yields identical outputs.
pub fn apply_edit(table: &PriceTable, job: &Job, draft: &JobDraft) -> Result<JobPatch, EngineError> {
    validate_draft(draft)?;

    let initial_km = parse_num(&draft.initial_km);
    let mut patch = JobPatch {
        client: Some(draft.client.trim().to_string()),
        service_type: Some(draft.service_type.clone()),
        plate: Some(draft.plate.trim().to_uppercase()),
        model: Some(draft.model.trim().to_string()),
        start_date: Some(draft.start_date.clone()),
        start_time: Some(draft.start_time.clone()),
        note: Some(draft.note.clone()),
        payment_method: Some(draft.payment_method),
        due_date: Some(match draft.payment_method {
            PaymentMethod::OnTerms => Some(draft.due_date.trim().to_string()),
            PaymentMethod::Immediate => None,
        }),
        extra_costs: Some(parse_num(&draft.extra_costs).unwrap_or(0.0)),
        initial_km: Some(initial_km),
        ..JobPatch::default()
    };

    if !draft.end_date.trim().is_empty() && !draft.end_time.trim().is_empty() {
        let start = parse_instant(&draft.start_date, &draft.start_time)?;
        let end = parse_instant(&draft.end_date, &draft.end_time)?;
        let (distance_km, final_km) =
            distance_driven(initial_km, parse_num(&draft.final_km).unwrap_or(0.0));

        let mut snapshot = job.clone();
        patch.end_date = Some(draft.end_date.clone());
        patch.end_time = Some(draft.end_time.clone());
        patch.elapsed_hours = Some(elapsed_hours(start, end));
        patch.distance_km = Some(distance_km);
        patch.final_km = Some(final_km);
        patch.apply_to(&mut snapshot);

        let billing = compute_amount(table, &mut snapshot);
        patch.amount = Some(billing.amount);
        patch.extra_hour_cost = Some(billing.extra_hour_cost);
        patch.extra_km_cost = Some(billing.extra_km_cost);
    }

    Ok(patch)
}

/// Preview the amount for the current edit buffers without persisting.
///
/// Returns `None` until the draft has a full start and end instant.
pub fn preview_amount(table: &PriceTable, job: &Job, draft: &JobDraft) -> Option<Billing> {
    if draft.end_date.trim().is_empty() || draft.end_time.trim().is_empty() {
        return None;
    }
    let start = parse_instant(&draft.start_date, &draft.start_time).ok()?;
    let end = parse_instant(&draft.end_date, &draft.end_time).ok()?;
    let initial_km = parse_num(&draft.initial_km);
    let (distance_km, _) = distance_driven(initial_km, parse_num(&draft.final_km).unwrap_or(0.0));

    let mut snapshot = job.clone();
    snapshot.client = draft.client.clone();
    snapshot.service_type = draft.service_type.clone();
    snapshot.elapsed_hours = Some(elapsed_hours(start, end));
    snapshot.distance_km = distance_km;
    Some(compute_amount(table, &mut snapshot))
}

/// Overdue: unpaid, non-cancelled, on-terms and past its due date.
///
/// `today` is a `YYYY-MM-DD` string; the comparison is pure calendar-date
/// ordering with no time-of-day component.
pub fn is_overdue(job: &Job, today: &str) -> bool {
    job.payment_method == PaymentMethod::OnTerms
        && job.payment_state != PaymentState::Paid
        && job.status != JobStatus::Cancelled
        && job
            .due_date
            .as_deref()
            .is_some_and(|due| !due.is_empty() && today > due)
}

fn start_instant(job: &Job) -> NaiveDateTime {
    // Unparseable rows sink to the bottom of the history ordering.
    parse_instant(&job.start_date, &job.start_time).unwrap_or(NaiveDateTime::UNIX_EPOCH)
}

/// Order history: overdue jobs before all others, ties broken by
/// descending start timestamp.
pub fn sort_history(jobs: &mut [Job], today: &str) {
    jobs.sort_by(|a, b| {
        let a_overdue = is_overdue(a, today);
        let b_overdue = is_overdue(b, today);
        b_overdue
            .cmp(&a_overdue)
            .then_with(|| start_instant(b).cmp(&start_instant(a)))
    });
}

/// Order the full snapshot by creation time, newest first.
pub fn sort_by_created_desc(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Hour component of `now`, used to pick the greeting of the
/// payment-reminder message.
pub fn hour_of(now: NaiveDateTime) -> u32 {
    now.time().hour()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PriceTable;
    use chrono::NaiveDate;

    fn test_job() -> Job {
        Job {
            id: "j1".into(),
            uid: "op1".into(),
            email: "op@example.com".into(),
            client: "Sancor".into(),
            service_type: "APOIO".into(),
            plate: "ABC1D23".into(),
            model: "Uno".into(),
            start_date: "2026-03-10".into(),
            start_time: "08:00".into(),
            end_date: None,
            end_time: None,
            elapsed_hours: None,
            initial_km: None,
            final_km: None,
            distance_km: 0.0,
            extra_costs: 0.0,
            amount: None,
            extra_hour_cost: 0.0,
            extra_km_cost: 0.0,
            payment_method: PaymentMethod::Immediate,
            payment_state: PaymentState::Pending,
            due_date: None,
            status: JobStatus::Active,
            note: String::new(),
            created_at: "2026-03-10T08:00:00Z".into(),
        }
    }

    fn table_base_150() -> PriceTable {
        let mut table = PriceTable::new();
        table.insert(
            "Sancor".into(),
            std::collections::BTreeMap::from([("default".to_string(), 150.0)]),
        );
        table
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_instant(date, time).unwrap()
    }

    #[test]
    fn hour_surcharge_zero_within_included_window() {
        assert_eq!(extra_hour_cost(0.0), 0.0);
        assert_eq!(extra_hour_cost(3.0), 0.0);
        assert_eq!(extra_hour_cost(4.5), 45.0);
    }

    #[test]
    fn km_surcharge_zero_within_allowance() {
        assert_eq!(extra_km_cost(50.0), 0.0);
        assert_eq!(extra_km_cost(49.9), 0.0);
        assert_eq!(extra_km_cost(70.0), 20.0);
    }

    #[test]
    fn amount_combines_base_and_surcharges() {
        // 4.5h, 70km, base 150 -> 45 + 20 + 150 = 215.
        let table = table_base_150();
        let mut job = test_job();
        job.status = JobStatus::Finished;
        job.elapsed_hours = Some(4.5);
        job.distance_km = 70.0;

        let billing = compute_amount(&table, &mut job);
        assert_eq!(billing.extra_hour_cost, 45.0);
        assert_eq!(billing.extra_km_cost, 20.0);
        assert_eq!(billing.amount, 215.0);
        // The breakdown is written back onto the snapshot.
        assert_eq!(job.extra_hour_cost, 45.0);
        assert_eq!(job.extra_km_cost, 20.0);
    }

    #[test]
    fn cancelled_job_bills_zero() {
        let table = table_base_150();
        let mut job = test_job();
        job.status = JobStatus::Cancelled;
        job.elapsed_hours = Some(12.0);
        job.distance_km = 500.0;
        job.extra_hour_cost = 99.0;
        job.extra_km_cost = 99.0;

        let billing = compute_amount(&table, &mut job);
        assert_eq!(billing.amount, 0.0);
        assert_eq!(job.extra_hour_cost, 0.0);
        assert_eq!(job.extra_km_cost, 0.0);
    }

    #[test]
    fn distance_never_negative_with_odometer_rollback() {
        let (km, final_km) = distance_driven(Some(1200.0), 1100.0);
        assert_eq!(km, 0.0);
        assert_eq!(final_km, Some(1100.0));
    }

    #[test]
    fn distance_input_is_absolute_reading_with_initial_km() {
        let (km, final_km) = distance_driven(Some(1200.0), 1275.0);
        assert_eq!(km, 75.0);
        assert_eq!(final_km, Some(1275.0));
    }

    #[test]
    fn distance_input_is_total_without_initial_km() {
        let (km, final_km) = distance_driven(None, 42.0);
        assert_eq!(km, 42.0);
        assert_eq!(final_km, None);
    }

    #[test]
    fn elapsed_hours_never_negative() {
        let start = at("2026-03-10", "08:00");
        let end = at("2026-03-10", "07:00");
        assert_eq!(elapsed_hours(start, end), 0.0);
        assert_eq!(elapsed_hours(end, start), 1.0);
    }

    #[test]
    fn elapsed_hours_keeps_sub_minute_seconds() {
        // 4h 30m 30s = 16230 s = 4.5083 h, rounded to two decimals.
        let start = at("2026-03-10", "08:00:00");
        let end = at("2026-03-10", "12:30:30");
        assert_eq!(elapsed_hours(start, end), 4.51);
    }

    #[test]
    fn short_finish_requires_decision() {
        let job = test_job();
        let draft = prepare_finish(&job, at("2026-03-10", "08:05"), 30.0).unwrap();
        assert!(draft.is_short());
        assert_eq!(draft.elapsed_minutes, 5);
    }

    #[test]
    fn short_finish_confirmed_genuine_bills_normally() {
        // 5-minute dispatch the operator confirms as a real service.
        let table = table_base_150();
        let job = test_job();
        let draft = prepare_finish(&job, at("2026-03-10", "08:05"), 30.0).unwrap();
        let patch = settle_finish(&table, &job, &draft, FinishDecision::Genuine);

        assert_eq!(patch.status, Some(JobStatus::Finished));
        assert_eq!(patch.amount, Some(150.0));
        assert_eq!(patch.elapsed_hours, Some(0.08));
    }

    #[test]
    fn short_finish_confirmed_void_cancels_with_zero() {
        let table = table_base_150();
        let job = test_job();
        let draft = prepare_finish(&job, at("2026-03-10", "08:05"), 30.0).unwrap();
        let patch = settle_finish(&table, &job, &draft, FinishDecision::Void);

        assert_eq!(patch.status, Some(JobStatus::Cancelled));
        assert_eq!(patch.amount, Some(0.0));
        assert_eq!(patch.extra_hour_cost, Some(0.0));
        assert_eq!(patch.extra_km_cost, Some(0.0));
    }

    #[test]
    fn normal_finish_records_all_derived_fields() {
        let table = table_base_150();
        let mut job = test_job();
        job.initial_km = Some(1000.0);
        let draft = prepare_finish(&job, at("2026-03-10", "12:30"), 1070.0).unwrap();
        assert!(!draft.is_short());

        let patch = settle_finish(&table, &job, &draft, FinishDecision::Genuine);
        assert_eq!(patch.end_date.as_deref(), Some("2026-03-10"));
        assert_eq!(patch.end_time.as_deref(), Some("12:30"));
        assert_eq!(patch.elapsed_hours, Some(4.5));
        assert_eq!(patch.distance_km, Some(70.0));
        assert_eq!(patch.final_km, Some(Some(1070.0)));
        // 150 base + 45 hour surcharge + 20 km surcharge.
        assert_eq!(patch.amount, Some(215.0));
    }

    #[test]
    fn toggle_payment_flips_state_only() {
        let mut job = test_job();
        job.status = JobStatus::Finished;
        let patch = toggle_payment(&job);
        assert_eq!(patch.payment_state, Some(PaymentState::Paid));
        assert_eq!(patch.status, None);

        job.payment_state = PaymentState::Paid;
        let patch = toggle_payment(&job);
        assert_eq!(patch.payment_state, Some(PaymentState::Pending));
    }

    fn finished_draft(job: &Job) -> JobDraft {
        JobDraft {
            client: job.client.clone(),
            service_type: job.service_type.clone(),
            plate: job.plate.clone(),
            model: job.model.clone(),
            start_date: job.start_date.clone(),
            start_time: job.start_time.clone(),
            payment_method: job.payment_method,
            due_date: job.due_date.clone().unwrap_or_default(),
            extra_costs: job.extra_costs.to_string(),
            initial_km: job.initial_km.map(|v| v.to_string()).unwrap_or_default(),
            note: job.note.clone(),
            end_date: String::new(),
            end_time: String::new(),
            final_km: String::new(),
        }
    }

    #[test]
    fn edit_without_end_fields_leaves_money_untouched() {
        let table = table_base_150();
        let mut job = test_job();
        job.status = JobStatus::Finished;
        job.amount = Some(215.0);
        job.extra_hour_cost = 45.0;
        job.extra_km_cost = 20.0;

        let mut draft = finished_draft(&job);
        draft.model = "Gol".into();
        let patch = apply_edit(&table, &job, &draft).unwrap();

        assert_eq!(patch.model.as_deref(), Some("Gol"));
        assert_eq!(patch.amount, None);
        assert_eq!(patch.extra_hour_cost, None);
        assert_eq!(patch.extra_km_cost, None);
        assert_eq!(patch.status, None);
    }

    #[test]
    fn edit_with_end_fields_recomputes_deterministically() {
        let table = table_base_150();
        let mut job = test_job();
        job.status = JobStatus::Finished;

        let mut draft = finished_draft(&job);
        draft.end_date = "2026-03-10".into();
        draft.end_time = "12:30".into();
        draft.final_km = "70".into();

        let first = apply_edit(&table, &job, &draft).unwrap();
        assert_eq!(first.elapsed_hours, Some(4.5));
        assert_eq!(first.amount, Some(215.0));

        // Idempotent: identical inputs yield identical outputs.
        let mut edited = job.clone();
        first.apply_to(&mut edited);
        let second = apply_edit(&table, &edited, &draft).unwrap();
        assert_eq!(second.amount, first.amount);
        assert_eq!(second.elapsed_hours, first.elapsed_hours);
        assert_eq!(second.extra_hour_cost, first.extra_hour_cost);
    }

    #[test]
    fn validation_rejects_missing_client() {
        let draft = JobDraft {
            service_type: "APOIO".into(),
            start_date: "2026-03-10".into(),
            start_time: "08:00".into(),
            ..JobDraft::default()
        };
        assert!(matches!(
            validate_draft(&draft),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn validation_requires_due_date_for_on_terms() {
        let draft = JobDraft {
            client: "Sancor".into(),
            service_type: "APOIO".into(),
            start_date: "2026-03-10".into(),
            start_time: "08:00".into(),
            payment_method: PaymentMethod::OnTerms,
            ..JobDraft::default()
        };
        assert!(validate_draft(&draft).is_err());
    }

    #[test]
    fn new_job_normalizes_plate_and_assigns_pending_state() {
        let draft = JobDraft {
            client: "Sancor".into(),
            service_type: "APOIO".into(),
            plate: "abc1d23".into(),
            start_date: "2026-03-10".into(),
            start_time: "08:00".into(),
            extra_costs: "12,50".into(),
            ..JobDraft::default()
        };
        let job = new_job(&draft, "op1", "op@example.com", "2026-03-10T08:00:00Z".into()).unwrap();
        assert_eq!(job.plate, "ABC1D23");
        assert_eq!(job.extra_costs, 12.5);
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.payment_state, PaymentState::Pending);
        assert!(job.amount.is_none());
    }

    fn overdue_job(id: &str, due: &str, start_date: &str) -> Job {
        let mut job = test_job();
        job.id = id.into();
        job.status = JobStatus::Finished;
        job.payment_method = PaymentMethod::OnTerms;
        job.due_date = Some(due.into());
        job.start_date = start_date.into();
        job
    }

    #[test]
    fn overdue_rule_matches_all_conditions() {
        let today = "2026-03-15";
        let mut job = overdue_job("a", "2026-03-14", "2026-03-01");
        assert!(is_overdue(&job, today));

        job.payment_state = PaymentState::Paid;
        assert!(!is_overdue(&job, today));

        job.payment_state = PaymentState::Pending;
        job.status = JobStatus::Cancelled;
        assert!(!is_overdue(&job, today));

        job.status = JobStatus::Finished;
        job.payment_method = PaymentMethod::Immediate;
        assert!(!is_overdue(&job, today));

        // Due today is not overdue; only strictly past the due date.
        let job = overdue_job("b", today, "2026-03-01");
        assert!(!is_overdue(&job, today));
    }

    #[test]
    fn history_sorts_overdue_first_then_start_desc() {
        let today = "2026-03-15";
        // A due yesterday, B due next week, C overdue but older start.
        let a = overdue_job("a", "2026-03-14", "2026-03-02");
        let b = overdue_job("b", "2026-03-22", "2026-03-05");
        let c = overdue_job("c", "2026-03-10", "2026-03-01");

        let mut jobs = vec![b.clone(), c.clone(), a.clone()];
        sort_history(&mut jobs, today);
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn missing_job_is_reported_as_not_found() {
        let jobs = vec![test_job()];
        assert!(find_job(&jobs, "j1").is_ok());
        assert!(matches!(
            find_job(&jobs, "zz"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn date_parse_failure_is_a_validation_error() {
        let job = test_job();
        let mut broken = job.clone();
        broken.start_date = "10/03/2026".into();
        let err = prepare_finish(&broken, at("2026-03-10", "09:00"), 0.0).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
