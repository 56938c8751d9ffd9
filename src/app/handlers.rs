//! Key input handlers, one per screen plus the popups.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    engine::{self, FinishDecision},
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    jobs::{Job, JobDraft, JobStatus, SERVICE_TYPES},
    message,
    pricing::standard_defaults,
    shortcuts,
    worker::WorkerCmd,
};

use super::{App, ConfirmState, request_refresh};

/// Labels of the entry form fields, in field-index order. The last three
/// are only offered when editing a job that already ended.
pub(super) const ENTRY_FIELDS: [&str; 13] = [
    "Empresa",
    "Tipo",
    "Placa",
    "Modelo",
    "Data início",
    "Hora início",
    "Vencimento",
    "Custos extras",
    "KM inicial",
    "Observações",
    "Data fim",
    "Hora fim",
    "KM final",
];

/// Number of fields offered by the entry form in its current mode.
/// End-of-job fields are only editable on jobs that already ended.
pub(super) fn entry_field_count(app: &App) -> usize {
    let editing_terminal = app
        .editing_job_id
        .as_ref()
        .and_then(|id| engine::find_job(&app.jobs, id).ok())
        .is_some_and(|j| j.status.is_terminal());
    if editing_terminal {
        ENTRY_FIELDS.len()
    } else {
        ENTRY_FIELDS.len() - 3
    }
}

/// Current buffer value of one entry field.
pub(super) fn entry_field_value(draft: &JobDraft, idx: usize) -> String {
    match idx {
        0 => draft.client.clone(),
        1 => draft.service_type.clone(),
        2 => draft.plate.clone(),
        3 => draft.model.clone(),
        4 => draft.start_date.clone(),
        5 => draft.start_time.clone(),
        6 => draft.due_date.clone(),
        7 => draft.extra_costs.clone(),
        8 => draft.initial_km.clone(),
        9 => draft.note.clone(),
        10 => draft.end_date.clone(),
        11 => draft.end_time.clone(),
        _ => draft.final_km.clone(),
    }
}

fn set_entry_field(draft: &mut JobDraft, idx: usize, value: String) {
    match idx {
        0 => draft.client = value,
        1 => draft.service_type = value,
        2 => draft.plate = value,
        3 => draft.model = value,
        4 => draft.start_date = value,
        5 => draft.start_time = value,
        6 => draft.due_date = value,
        7 => draft.extra_costs = value,
        8 => draft.initial_km = value,
        9 => draft.note = value,
        10 => draft.end_date = value,
        11 => draft.end_time = value,
        _ => draft.final_km = value,
    }
}

/// Handle one key event; returns true when the app should exit.
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // Popups take priority over the screen underneath.
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }
    if app.confirm.is_some() {
        return handle_confirm_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Login => handle_login_key(app, k).await,
        Screen::Active => handle_active_key(app, k).await,
        Screen::History => handle_history_key(app, k).await,
        Screen::Entry => handle_entry_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
    }
}

/// Ctrl+C always exits, regardless of screen or popup.
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

fn open_input(app: &mut App, state: InputBoxState) {
    app.input_box = Some(state);
}

async fn handle_login_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.login;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.email) {
        let value = app.login_email.clone();
        open_input(
            app,
            InputBoxState::new("Email", value, InputCallbackId::LoginEmail),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.password) {
        open_input(
            app,
            InputBoxState::new("Senha", "", InputCallbackId::LoginPassword).masked(),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        submit_login(app, false).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.register) {
        submit_login(app, true).await?;
    }

    Ok(false)
}

async fn submit_login(app: &mut App, register: bool) -> Result<()> {
    if app.login_email.trim().is_empty() || app.login_password.is_empty() {
        app.ui.error = Some("Informe email e senha.".into());
        return Ok(());
    }
    app.ui.error = None;
    app.ui.status = if register {
        "Criando conta...".into()
    } else {
        "Entrando...".into()
    };
    app.worker_tx
        .send(WorkerCmd::SignIn {
            email: app.login_email.trim().to_string(),
            password: app.login_password.clone(),
            register,
        })
        .await?;
    Ok(())
}

async fn handle_active_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.active;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.history) {
        app.ui.screen = Screen::History;
        app.ui.selected = 0;
        app.ui.status = "Histórico".into();
    } else if shortcuts::matches_shortcut(&k, &sc.new_job) {
        start_new_draft(app);
    } else if shortcuts::matches_shortcut(&k, &sc.settings) {
        app.pricing_buf = app.pricing.clone();
        app.ui.screen = Screen::Settings;
        app.ui.selected = 0;
        app.ui.status = "Tabela de preços".into();
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        request_refresh(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.finish) {
        let selected = app
            .active_jobs()
            .get(app.ui.selected)
            .map(|j| (j.id.clone(), j.initial_km));
        if let Some((job_id, initial_km)) = selected {
            app.pending_finish = Some(job_id);
            let prompt = match initial_km {
                Some(initial) => format!("KM final (odômetro, inicial {initial})"),
                None => "KM rodado".to_string(),
            };
            open_input(
                app,
                InputBoxState::new(prompt, "", InputCallbackId::FinishKm),
            );
        }
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        let selected = app.active_jobs().get(app.ui.selected).map(|j| (*j).clone());
        if let Some(job) = selected {
            load_draft_from_job(app, &job);
        }
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        let selected = app.active_jobs().get(app.ui.selected).map(|j| j.id.clone());
        if let Some(job_id) = selected {
            app.confirm = Some(ConfirmState::DeleteJob { job_id });
        }
    } else if shortcuts::matches_shortcut(&k, &sc.sign_out) {
        app.confirm = Some(ConfirmState::SignOut);
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.active_jobs().len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) && app.ui.selected > 0 {
        app.ui.selected -= 1;
    }

    Ok(false)
}

async fn handle_history_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.history;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.ui.screen = Screen::Active;
        app.ui.selected = 0;
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        request_refresh(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_paid) {
        if let Some(job) = app.history_jobs().get(app.ui.selected).cloned() {
            // Cancelled jobs bill zero; there is nothing to settle.
            if job.status == JobStatus::Finished {
                let patch = engine::toggle_payment(&job);
                app.worker_tx
                    .send(WorkerCmd::UpdateJob { id: job.id, patch })
                    .await?;
                app.ui.status = "Atualizando pagamento...".into();
            }
        }
    } else if shortcuts::matches_shortcut(&k, &sc.message) {
        if let Some(job) = app.history_jobs().get(app.ui.selected).cloned() {
            let hour = engine::hour_of(chrono::Local::now().naive_local());
            let msg = message::collection_message(&job, hour);
            app.ui.log.push("--- mensagem de cobrança ---".into());
            app.ui.log.extend(msg.lines().map(str::to_string));
            app.ui.status = "Mensagem gerada no painel.".into();
        }
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        if let Some(job) = app.history_jobs().get(app.ui.selected).cloned() {
            load_draft_from_job(app, &job);
        }
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        if let Some(job) = app.history_jobs().get(app.ui.selected).cloned() {
            app.confirm = Some(ConfirmState::DeleteJob { job_id: job.id });
        }
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.history_jobs().len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) && app.ui.selected > 0 {
        app.ui.selected -= 1;
    }

    Ok(false)
}

/// Open the entry form with an empty draft pre-filled with "now".
fn start_new_draft(app: &mut App) {
    let now = chrono::Local::now();
    app.draft = JobDraft {
        service_type: SERVICE_TYPES[0].to_string(),
        start_date: now.format("%Y-%m-%d").to_string(),
        start_time: now.format("%H:%M").to_string(),
        ..JobDraft::default()
    };
    app.editing_job_id = None;
    app.ui.screen = Screen::Entry;
    app.ui.editing_field_idx = 0;
    app.ui.error = None;
    app.ui.status = "Novo serviço".into();
}

/// Open the entry form loaded from an existing job.
fn load_draft_from_job(app: &mut App, job: &Job) {
    app.draft = JobDraft {
        client: job.client.clone(),
        service_type: job.service_type.clone(),
        plate: job.plate.clone(),
        model: job.model.clone(),
        start_date: job.start_date.clone(),
        start_time: job.start_time.clone(),
        payment_method: job.payment_method,
        due_date: job.due_date.clone().unwrap_or_default(),
        extra_costs: if job.extra_costs > 0.0 {
            job.extra_costs.to_string()
        } else {
            String::new()
        },
        initial_km: job.initial_km.map(|v| v.to_string()).unwrap_or_default(),
        note: job.note.clone(),
        end_date: job.end_date.clone().unwrap_or_default(),
        end_time: job.end_time.clone().unwrap_or_default(),
        final_km: job.final_km.map(|v| v.to_string()).unwrap_or_default(),
    };
    app.editing_job_id = Some(job.id.clone());
    app.ui.screen = Screen::Entry;
    app.ui.editing_field_idx = 0;
    app.ui.error = None;
    app.ui.status = format!("Editando {}", job.plate);
}

async fn handle_entry_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.entry;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        leave_entry(app);
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.editing_field_idx = (app.ui.editing_field_idx + 1) % entry_field_count(app);
    } else if shortcuts::matches_shortcut(&k, &sc.prev_field) {
        let count = entry_field_count(app);
        app.ui.editing_field_idx = (app.ui.editing_field_idx + count - 1) % count;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_payment) {
        app.draft.payment_method = match app.draft.payment_method {
            crate::jobs::PaymentMethod::Immediate => crate::jobs::PaymentMethod::OnTerms,
            crate::jobs::PaymentMethod::OnTerms => crate::jobs::PaymentMethod::Immediate,
        };
    } else if shortcuts::matches_shortcut(&k, &sc.edit_field) {
        let idx = app.ui.editing_field_idx;
        if idx == 1 {
            // The service type cycles through the known categories.
            let pos = SERVICE_TYPES
                .iter()
                .position(|t| *t == app.draft.service_type)
                .unwrap_or(SERVICE_TYPES.len() - 1);
            app.draft.service_type = SERVICE_TYPES[(pos + 1) % SERVICE_TYPES.len()].to_string();
        } else {
            let value = entry_field_value(&app.draft, idx);
            open_input(
                app,
                InputBoxState::new(ENTRY_FIELDS[idx], value, InputCallbackId::EntryField(idx)),
            );
        }
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        submit_entry(app).await?;
    }

    Ok(false)
}

fn leave_entry(app: &mut App) {
    // Edits of terminal jobs return to the history, everything else to
    // the active list.
    let back_to_history = app
        .editing_job_id
        .as_ref()
        .and_then(|id| app.jobs.iter().find(|j| &j.id == id))
        .is_some_and(|j| j.status.is_terminal());
    app.ui.screen = if back_to_history {
        Screen::History
    } else {
        Screen::Active
    };
    app.editing_job_id = None;
    app.ui.error = None;
}

async fn submit_entry(app: &mut App) -> Result<()> {
    let Some(op) = app.operator.clone() else {
        app.ui.error = Some("Sessão expirada; entre novamente.".into());
        return Ok(());
    };

    if let Some(id) = app.editing_job_id.clone() {
        let job = match engine::find_job(&app.jobs, &id) {
            Ok(job) => job.clone(),
            Err(e) => {
                app.ui.error = Some(e.to_string());
                return Ok(());
            }
        };
        match engine::apply_edit(&app.pricing, &job, &app.draft) {
            Ok(patch) => {
                app.worker_tx
                    .send(WorkerCmd::UpdateJob { id, patch })
                    .await?;
                app.ui.status = "Salvando alterações...".into();
                leave_entry(app);
            }
            Err(e) => app.ui.error = Some(e.to_string()),
        }
    } else {
        let created_at = chrono::Utc::now().to_rfc3339();
        match engine::new_job(&app.draft, &op.uid, &op.email, created_at) {
            Ok(job) => {
                app.worker_tx.send(WorkerCmd::CreateJob(job)).await?;
                app.ui.status = "Registrando serviço...".into();
                leave_entry(app);
            }
            Err(e) => app.ui.error = Some(e.to_string()),
        }
    }
    Ok(())
}

async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.ui.screen = Screen::Active;
        app.ui.selected = 0;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.worker_tx
            .send(WorkerCmd::SavePricing(app.pricing_buf.clone()))
            .await?;
        app.ui.status = "Salvando tabela...".into();
    } else if shortcuts::matches_shortcut(&k, &sc.edit_price) {
        let rows = app.pricing_rows();
        if let Some((client, service_type)) = rows.get(app.ui.selected).cloned() {
            let current = app
                .pricing_buf
                .get(&client)
                .and_then(|p| p.get(&service_type))
                .copied()
                .unwrap_or(0.0);
            open_input(
                app,
                InputBoxState::new(
                    format!("{client} / {service_type}"),
                    format!("{current}"),
                    InputCallbackId::PriceValue(app.ui.selected),
                ),
            );
        }
    } else if shortcuts::matches_shortcut(&k, &sc.add_client) {
        open_input(
            app,
            InputBoxState::new("Nova empresa", "", InputCallbackId::AddClient),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.remove_client) {
        let rows = app.pricing_rows();
        if let Some((client, _)) = rows.get(app.ui.selected).cloned() {
            app.pricing_buf.remove(&client);
            app.ui.selected = 0;
            app.ui.status = format!("{client} removida (salve para confirmar)");
        }
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.pricing_rows().len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) && app.ui.selected > 0 {
        app.ui.selected -= 1;
    }

    Ok(false)
}

/// Keys of the confirmation dialogs.
async fn handle_confirm_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(confirm) = app.confirm.clone() else {
        return Ok(false);
    };

    if k.code == KeyCode::Esc {
        app.confirm = None;
        app.ui.status = "Cancelado.".into();
        return Ok(false);
    }

    match confirm {
        ConfirmState::FinishNormal { job_id, draft } => {
            if matches!(k.code, KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char('y')) {
                settle(app, &job_id, &draft, FinishDecision::Genuine).await?;
            }
        }
        ConfirmState::FinishShort { job_id, draft } => match k.code {
            // Short dispatch: (c)obrar normally or (v) void it.
            KeyCode::Char('c') => {
                settle(app, &job_id, &draft, FinishDecision::Genuine).await?;
            }
            KeyCode::Char('v') => {
                settle(app, &job_id, &draft, FinishDecision::Void).await?;
            }
            _ => {}
        },
        ConfirmState::DeleteJob { job_id } => {
            if matches!(k.code, KeyCode::Enter | KeyCode::Char('y')) {
                app.worker_tx
                    .send(WorkerCmd::DeleteJob { id: job_id })
                    .await?;
                app.confirm = None;
                app.ui.status = "Excluindo...".into();
            }
        }
        ConfirmState::SignOut => {
            if matches!(k.code, KeyCode::Enter | KeyCode::Char('y')) {
                app.worker_tx.send(WorkerCmd::SignOut).await?;
                app.confirm = None;
            }
        }
    }

    Ok(false)
}

async fn settle(
    app: &mut App,
    job_id: &str,
    draft: &engine::FinishDraft,
    decision: FinishDecision,
) -> Result<()> {
    let job = match engine::find_job(&app.jobs, job_id) {
        Ok(job) => job.clone(),
        Err(e) => {
            app.confirm = None;
            app.ui.error = Some(e.to_string());
            return Ok(());
        }
    };
    let patch = engine::settle_finish(&app.pricing, &job, draft, decision);
    app.worker_tx
        .send(WorkerCmd::UpdateJob {
            id: job.id,
            patch,
        })
        .await?;
    app.confirm = None;
    app.ui.status = match decision {
        FinishDecision::Genuine => "Finalizando serviço...".into(),
        FinishDecision::Void => "Cancelando serviço...".into(),
    };
    Ok(())
}

/// Keys while the input popup is open.
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        if let Some(input) = app.input_box.take() {
            apply_input(app, input).await?;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
        app.pending_finish = None;
    } else if let Some(input) = app.input_box.as_mut() {
        if shortcuts::matches_shortcut(&k, &sc.backspace) {
            input.backspace();
        } else if shortcuts::matches_shortcut(&k, &sc.delete) {
            input.delete();
        } else if shortcuts::matches_shortcut(&k, &sc.left) {
            input.move_left();
        } else if shortcuts::matches_shortcut(&k, &sc.right) {
            input.move_right();
        } else if shortcuts::matches_shortcut(&k, &sc.home) {
            input.move_home();
        } else if shortcuts::matches_shortcut(&k, &sc.end) {
            input.move_end();
        } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
            input.clear_line();
        } else if let KeyCode::Char(c) = k.code {
            input.insert_char(c);
        }
    }

    Ok(false)
}

/// Route a confirmed popup value to its destination.
async fn apply_input(app: &mut App, input: InputBoxState) -> Result<()> {
    match input.callback_id {
        InputCallbackId::LoginEmail => {
            app.login_email = input.value;
        }
        InputCallbackId::LoginPassword => {
            app.login_password = input.value;
        }
        InputCallbackId::EntryField(idx) => {
            set_entry_field(&mut app.draft, idx, input.value);
        }
        InputCallbackId::FinishKm => {
            let Some(job_id) = app.pending_finish.take() else {
                return Ok(());
            };
            let job = match engine::find_job(&app.jobs, &job_id) {
                Ok(job) => job.clone(),
                Err(e) => {
                    app.ui.error = Some(e.to_string());
                    return Ok(());
                }
            };
            let km = input.value.trim().replace(',', ".").parse().unwrap_or(0.0);
            let now = chrono::Local::now().naive_local();
            match engine::prepare_finish(&job, now, km) {
                Ok(draft) => {
                    app.confirm = Some(if draft.is_short() {
                        ConfirmState::FinishShort { job_id, draft }
                    } else {
                        ConfirmState::FinishNormal { job_id, draft }
                    });
                }
                Err(e) => app.ui.error = Some(e.to_string()),
            }
        }
        InputCallbackId::PriceValue(row) => {
            let rows = app.pricing_rows();
            if let Some((client, service_type)) = rows.get(row).cloned()
                && let Ok(price) = input.value.trim().replace(',', ".").parse::<f64>()
                && let Some(prices) = app.pricing_buf.get_mut(&client)
            {
                prices.insert(service_type, price.max(0.0));
            }
        }
        InputCallbackId::AddClient => {
            let name = input.value.trim().to_string();
            if !name.is_empty() {
                app.pricing_buf.entry(name).or_insert_with(standard_defaults);
            }
        }
    }
    Ok(())
}
