//! TUI event loop, input handling and app state.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    engine::{self, FinishDraft},
    events::{Screen, UiState},
    input::InputBoxState,
    jobs::{Job, JobDraft, JobStatus},
    pricing::{self, PriceTable},
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// Identity of the signed-in operator, as reported by the worker.
#[derive(Clone, Debug)]
pub struct Operator {
    pub uid: String,
    pub email: String,
    pub name: String,
}

/// A pending confirmation dialog. Nothing is persisted until the operator
/// answers; Esc always aborts and leaves the job untouched.
#[derive(Clone, Debug)]
pub enum ConfirmState {
    /// Normal finish: show the derived values, ask to confirm.
    FinishNormal { job_id: String, draft: FinishDraft },
    /// Short-duration finish: ask genuine-or-void.
    FinishShort { job_id: String, draft: FinishDraft },
    DeleteJob { job_id: String },
    SignOut,
}

/// App state shared by the handlers and the renderer.
pub struct App {
    pub cfg: Config,
    pub ui: UiState,
    /// Full job snapshot for the signed-in operator, newest first.
    pub jobs: Vec<Job>,
    /// Active price table: the operator's stored table, or the built-in
    /// defaults while none is saved.
    pub pricing: PriceTable,
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    pub shortcuts: Shortcuts,

    /// `Some` once signed in.
    pub operator: Option<Operator>,
    /// Login form buffers.
    pub login_email: String,
    pub login_password: String,

    /// Entry form buffers.
    pub draft: JobDraft,
    /// `Some` when the entry form edits an existing job.
    pub editing_job_id: Option<String>,

    /// Working copy of the price table while the settings editor is open.
    pub pricing_buf: PriceTable,

    /// Job awaiting the final-km input of the finish flow.
    pub pending_finish: Option<String>,

    /// Popup input (active while `Some`).
    pub input_box: Option<InputBoxState>,
    /// Pending confirmation dialog.
    pub confirm: Option<ConfirmState>,
}

impl App {
    /// Active jobs, in snapshot (newest-first) order.
    pub fn active_jobs(&self) -> Vec<&Job> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Active)
            .collect()
    }

    /// Terminal jobs, overdue first, then newest start first.
    pub fn history_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|j| j.status.is_terminal())
            .cloned()
            .collect();
        engine::sort_history(&mut jobs, &today());
        jobs
    }

    /// Flattened `(client, type)` rows of the settings editor, in display
    /// order. The price itself is looked up in `pricing_buf`.
    pub fn pricing_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        for (client, prices) in &self.pricing_buf {
            for service_type in prices.keys() {
                rows.push((client.clone(), service_type.clone()));
            }
        }
        rows
    }

    /// Job count of the list currently on screen, for selection clamping.
    fn visible_rows(&self) -> usize {
        match self.ui.screen {
            Screen::Active => self.active_jobs().len(),
            Screen::History => self.history_jobs().len(),
            Screen::Settings => self.pricing_rows().len(),
            _ => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.visible_rows();
        if rows == 0 {
            self.ui.selected = 0;
        } else if self.ui.selected >= rows {
            self.ui.selected = rows - 1;
        }
    }
}

/// Today as the `YYYY-MM-DD` string the overdue rule compares against.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Run the main TUI loop until the operator quits.
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    let cfg = Config::load_or_default(&PathBuf::from("config.toml"))?;

    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    // The worker owns all I/O; it resumes a saved session on its own.
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone()));

    let mut app = App {
        cfg,
        ui: UiState {
            screen: Screen::Login,
            selected: 0,
            log: vec![],
            status: "Conectando...".into(),
            editing_field_idx: 0,
            error: None,
        },
        jobs: vec![],
        pricing: pricing::default_table(),
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        shortcuts,
        operator: None,
        login_email: String::new(),
        login_password: String::new(),
        draft: JobDraft::default(),
        editing_job_id: None,
        pricing_buf: PriceTable::new(),
        pending_finish: None,
        input_box: None,
        confirm: None,
    };

    if !app.cfg.is_complete() {
        app.ui.status = "config.toml incompleto (api_key/project_id)".into();
    }

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker events before handling input.
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        // Short poll timeout keeps the UI responsive to worker events.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Fold a worker event into the app state.
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::SignedIn {
            uid,
            email,
            operator,
        } => {
            app.ui.log.push(format!("conectado: {email}"));
            app.ui.status = format!("Operador: {operator}");
            app.operator = Some(Operator {
                uid,
                email,
                name: operator,
            });
            app.login_password.clear();
            app.ui.error = None;
            if app.ui.screen == Screen::Login {
                app.ui.screen = Screen::Active;
            }
        }
        WorkerEvent::SignedOut => {
            app.operator = None;
            app.jobs.clear();
            app.pricing = pricing::default_table();
            app.ui.screen = Screen::Login;
            app.ui.selected = 0;
            app.ui.status = "Desconectado".into();
        }
        WorkerEvent::JobsLoaded(mut jobs) => {
            engine::sort_by_created_desc(&mut jobs);
            app.jobs = jobs;
            app.clamp_selection();
            app.ui.status = format!(
                "{} ativos / {} registros",
                app.active_jobs().len(),
                app.jobs.len()
            );
        }
        WorkerEvent::PricingLoaded(table) => {
            // The stored table replaces the built-ins wholesale; defaults
            // only apply while the operator has no saved table.
            app.pricing = table;
        }
        WorkerEvent::Log(s) => {
            app.ui.log.push(s);
        }
        WorkerEvent::Error(s) => {
            app.ui.error = Some(s.clone());
            app.ui.status = format!("Erro: {s}");
        }
    }
}

/// Ask the worker for a fresh snapshot.
pub async fn request_refresh(app: &mut App) -> Result<()> {
    tracing::info!("refresh requested");
    app.worker_tx.send(WorkerCmd::RefreshJobs).await?;
    app.ui.status = "Atualizando...".into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let (worker_tx, _) = mpsc::channel(8);
        let (_, worker_rx) = mpsc::channel(8);
        App {
            cfg: Config::default(),
            ui: UiState {
                screen: Screen::Active,
                selected: 0,
                log: vec![],
                status: String::new(),
                editing_field_idx: 0,
                error: None,
            },
            jobs: vec![],
            pricing: pricing::default_table(),
            worker_tx,
            worker_rx,
            shortcuts: Shortcuts::default(),
            operator: None,
            login_email: String::new(),
            login_password: String::new(),
            draft: JobDraft::default(),
            editing_job_id: None,
            pricing_buf: PriceTable::new(),
            pending_finish: None,
            input_box: None,
            confirm: None,
        }
    }

    #[test]
    fn loaded_pricing_replaces_builtin_table() {
        let mut app = test_app();

        // Saved table in which the operator removed "Carsystem"; the removal
        // must survive the next load instead of being re-seeded.
        let mut stored = PriceTable::new();
        stored.insert("Sancor".into(), pricing::standard_defaults());
        handle_worker_event(&mut app, WorkerEvent::PricingLoaded(stored));

        assert!(app.pricing.contains_key("Sancor"));
        assert!(!app.pricing.contains_key("Carsystem"));
    }
}
