//! Job entity: one dispatch-to-settlement record of a field service.

/// The six dispatch categories used by the business.
pub const SERVICE_TYPES: [&str; 6] = [
    "ROUBO/FURTO",
    "RECUPERAÇÃO",
    "VERIFICAÇÃO",
    "ALARME",
    "ANTENA",
    "APOIO",
];

/// Lifecycle status of a job. Active jobs carry no end time or money figures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Operator is dispatched, clock is running.
    Active,
    /// Completed and billed.
    Finished,
    /// Voided; amount is forced to zero.
    Cancelled,
}

impl JobStatus {
    /// Wire value stored in Firestore.
    pub fn as_wire(self) -> &'static str {
        match self {
            JobStatus::Active => "ATIVO",
            JobStatus::Finished => "FINALIZADO",
            JobStatus::Cancelled => "CANCELADO",
        }
    }

    /// Parse the wire value; unknown values are treated as active.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "FINALIZADO" => JobStatus::Finished,
            "CANCELADO" => JobStatus::Cancelled,
            _ => JobStatus::Active,
        }
    }

    /// Finished or cancelled.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Active)
    }
}

/// How the client settles the bill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Settled on the spot.
    #[default]
    Immediate,
    /// Deferred, with a due date.
    OnTerms,
}

impl PaymentMethod {
    pub fn as_wire(self) -> &'static str {
        match self {
            PaymentMethod::Immediate => "VISTA",
            PaymentMethod::OnTerms => "PRAZO",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "PRAZO" => PaymentMethod::OnTerms,
            _ => PaymentMethod::Immediate,
        }
    }
}

/// Whether the bill has been settled. Independent of [`JobStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Paid,
}

impl PaymentState {
    pub fn as_wire(self) -> &'static str {
        match self {
            PaymentState::Pending => "PENDENTE",
            PaymentState::Paid => "PAGO",
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "PAGO" => PaymentState::Paid,
            _ => PaymentState::Pending,
        }
    }

    /// The opposite state, used by the payment toggle.
    pub fn flipped(self) -> Self {
        match self {
            PaymentState::Pending => PaymentState::Paid,
            PaymentState::Paid => PaymentState::Pending,
        }
    }
}

/// One field-service job as held in memory.
///
/// Dates and times are kept as the wire strings (`YYYY-MM-DD`, `HH:MM`);
/// the engine parses them only where arithmetic is needed. Money fields are
/// two-decimal values computed exclusively by the engine.
#[derive(Clone, Debug)]
pub struct Job {
    /// Document id assigned on creation.
    pub id: String,
    /// Owner operator uid; jobs of other operators are never touched.
    pub uid: String,
    /// Owner e-mail, kept for display.
    pub email: String,

    /// Contracting client (empresa).
    pub client: String,
    /// One of [`SERVICE_TYPES`].
    pub service_type: String,
    /// License plate, normalized upper-case.
    pub plate: String,
    /// Vehicle model.
    pub model: String,

    /// Dispatch start date (`YYYY-MM-DD`).
    pub start_date: String,
    /// Dispatch start time (`HH:MM`).
    pub start_time: String,
    /// End date, set when the job leaves the active state.
    pub end_date: Option<String>,
    /// End time, set together with `end_date`.
    pub end_time: Option<String>,
    /// Derived elapsed hours, two decimals, never negative.
    pub elapsed_hours: Option<f64>,

    /// Odometer reading at dispatch, when the operator recorded one.
    pub initial_km: Option<f64>,
    /// Odometer reading at arrival, kept for reference.
    pub final_km: Option<f64>,
    /// Derived distance driven in km, never negative.
    pub distance_km: f64,

    /// Operator-entered reimbursable expenses.
    pub extra_costs: f64,
    /// Derived billable amount; `None` while the job is active.
    pub amount: Option<f64>,
    /// Derived surcharge for hours beyond the included window.
    pub extra_hour_cost: f64,
    /// Derived surcharge for distance beyond the included allowance.
    pub extra_km_cost: f64,

    pub payment_method: PaymentMethod,
    pub payment_state: PaymentState,
    /// Due date (`YYYY-MM-DD`), required only for on-terms payment.
    pub due_date: Option<String>,

    pub status: JobStatus,
    /// Free-text note.
    pub note: String,
    /// Creation timestamp (RFC 3339), assigned on submission.
    pub created_at: String,
}

impl Job {
    /// Total the client owes: service amount plus reimbursable expenses.
    pub fn total_due(&self) -> f64 {
        self.amount.unwrap_or(0.0) + self.extra_costs
    }
}

/// Partial update produced by the engine and applied by the store.
///
/// Only the present fields are written; the Firestore adapter turns them
/// into a field mask so a patch never clobbers unrelated fields.
#[derive(Clone, Debug, Default)]
pub struct JobPatch {
    pub client: Option<String>,
    pub service_type: Option<String>,
    pub plate: Option<String>,
    pub model: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub note: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_state: Option<PaymentState>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<String>>,
    pub extra_costs: Option<f64>,
    /// `Some(None)` clears the initial odometer.
    pub initial_km: Option<Option<f64>>,

    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub elapsed_hours: Option<f64>,
    pub distance_km: Option<f64>,
    /// `Some(None)` clears the stored final odometer.
    pub final_km: Option<Option<f64>>,

    pub amount: Option<f64>,
    pub extra_hour_cost: Option<f64>,
    pub extra_km_cost: Option<f64>,
    pub status: Option<JobStatus>,
}

impl JobPatch {
    /// Apply the patch to an in-memory job, mirroring what the store writes.
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(v) = &self.client {
            job.client = v.clone();
        }
        if let Some(v) = &self.service_type {
            job.service_type = v.clone();
        }
        if let Some(v) = &self.plate {
            job.plate = v.clone();
        }
        if let Some(v) = &self.model {
            job.model = v.clone();
        }
        if let Some(v) = &self.start_date {
            job.start_date = v.clone();
        }
        if let Some(v) = &self.start_time {
            job.start_time = v.clone();
        }
        if let Some(v) = &self.note {
            job.note = v.clone();
        }
        if let Some(v) = self.payment_method {
            job.payment_method = v;
        }
        if let Some(v) = self.payment_state {
            job.payment_state = v;
        }
        if let Some(v) = &self.due_date {
            job.due_date = v.clone();
        }
        if let Some(v) = self.extra_costs {
            job.extra_costs = v;
        }
        if let Some(v) = self.initial_km {
            job.initial_km = v;
        }
        if let Some(v) = &self.end_date {
            job.end_date = Some(v.clone());
        }
        if let Some(v) = &self.end_time {
            job.end_time = Some(v.clone());
        }
        if let Some(v) = self.elapsed_hours {
            job.elapsed_hours = Some(v);
        }
        if let Some(v) = self.distance_km {
            job.distance_km = v;
        }
        if let Some(v) = self.final_km {
            job.final_km = v;
        }
        if let Some(v) = self.amount {
            job.amount = Some(v);
        }
        if let Some(v) = self.extra_hour_cost {
            job.extra_hour_cost = v;
        }
        if let Some(v) = self.extra_km_cost {
            job.extra_km_cost = v;
        }
        if let Some(v) = self.status {
            job.status = v;
        }
    }
}

/// Raw form input for creating or editing a job. All fields are the
/// operator's text buffers; the engine validates and converts them.
#[derive(Clone, Debug, Default)]
pub struct JobDraft {
    pub client: String,
    pub service_type: String,
    pub plate: String,
    pub model: String,
    pub start_date: String,
    pub start_time: String,
    pub payment_method: PaymentMethod,
    pub due_date: String,
    pub extra_costs: String,
    pub initial_km: String,
    pub note: String,
    /// End fields are only offered when editing a finished job.
    pub end_date: String,
    pub end_time: String,
    pub final_km: String,
}
