//! Screen rendering.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
};

use crate::{
    engine,
    events::Screen,
    input,
    jobs::{Job, JobStatus, PaymentMethod, PaymentState},
    layout, message,
    shortcuts::Shortcuts,
};

use super::{App, ConfirmState, handlers, today};

/// Render the whole frame for the current screen, then the popups on top.
pub fn draw(f: &mut Frame, app: &App) {
    match app.ui.screen {
        Screen::Login => draw_login(f, app),
        Screen::Active => draw_active(f, app),
        Screen::History => draw_history(f, app),
        Screen::Entry => draw_entry(f, app),
        Screen::Settings => draw_settings(f, app),
    }

    if let Some(confirm) = &app.confirm {
        render_confirm(f, confirm);
    }
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

fn draw_login(f: &mut Frame, app: &App) {
    let outer_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Min(10),
            Constraint::Percentage(25),
        ])
        .split(f.area());

    let masked: String = std::iter::repeat_n('*', app.login_password.chars().count()).collect();
    let sc = &app.shortcuts.login;
    let content_text = format!(
        "=== Rastreamento de Serviços ===\n\n\
         Email: {}\n\
         Senha: {}\n\n\
         {}: email | {}: senha | {}: entrar | {}: criar conta | {}: sair",
        if app.login_email.is_empty() {
            "<vazio>"
        } else {
            &app.login_email
        },
        if masked.is_empty() { "<vazio>" } else { &masked },
        format_keys(&sc.email),
        format_keys(&sc.password),
        format_keys(&sc.submit),
        format_keys(&sc.register),
        format_keys(&sc.quit),
    );

    let content = Paragraph::new(content_text)
        .block(Block::default().borders(Borders::ALL).title("LOGIN"))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(content, outer_layout[1]);

    if let Some(err) = &app.ui.error {
        let error_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        let error_text = Paragraph::new(format!("ERRO: {err}"))
            .block(Block::default().borders(Borders::ALL).title("Erro"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(error_text, error_layout[1]);
    }
}

fn draw_active(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    let jobs = app.active_jobs();
    let rows = jobs.iter().map(|j| {
        Row::new(vec![
            j.client.clone(),
            j.service_type.clone(),
            j.plate.clone(),
            j.model.clone(),
            format!("{} {}", message::format_short_date(&j.start_date), j.start_time),
            j.initial_km.map(|v| format!("{v:.0}")).unwrap_or_default(),
            payment_label(j).to_string(),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(7),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("EM ANDAMENTO"))
    .header(Row::new(vec!["Empresa", "Tipo", "Placa", "Modelo", "Início", "KM", "Pgto"]).bold())
    .row_highlight_style(highlight_style());

    let mut table_state = ratatui::widgets::TableState::default();
    if !jobs.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, body_layout.jobs_table, &mut table_state);

    let detail = jobs
        .get(app.ui.selected)
        .map(|j| active_detail(j))
        .unwrap_or_else(|| "Nenhum serviço em andamento".into());
    render_info_panel(f, app, body_layout.info_panel, detail);
    render_help_bar(f, app, main_layout.help_bar);
    render_status_bar(f, app, main_layout.status_bar);
}

fn draw_history(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    let jobs = app.history_jobs();
    let today = today();
    let rows = jobs.iter().map(|j| {
        let row = Row::new(vec![
            message::format_short_date(&j.start_date),
            j.client.clone(),
            j.plate.clone(),
            status_label(j.status).to_string(),
            message::format_money(j.total_due()),
            payment_label(j).to_string(),
            j.due_date
                .as_deref()
                .map(message::format_short_date)
                .unwrap_or_default(),
        ]);
        if engine::is_overdue(j, &today) {
            row.style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        } else if j.status == JobStatus::Cancelled {
            row.style(Style::default().fg(Color::DarkGray))
        } else {
            row
        }
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Length(6),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("HISTÓRICO"))
    .header(
        Row::new(vec!["Data", "Empresa", "Placa", "Status", "Total", "Pgto", "Venc"]).bold(),
    )
    .row_highlight_style(highlight_style());

    let mut table_state = ratatui::widgets::TableState::default();
    if !jobs.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, body_layout.jobs_table, &mut table_state);

    let detail = jobs
        .get(app.ui.selected)
        .map(|j| history_detail(j, &today))
        .unwrap_or_else(|| "Histórico vazio".into());
    render_info_panel(f, app, body_layout.info_panel, detail);
    render_help_bar(f, app, main_layout.help_bar);
    render_status_bar(f, app, main_layout.status_bar);
}

fn draw_entry(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    let count = handlers::entry_field_count(app);
    let mut lines = vec![
        if app.editing_job_id.is_some() {
            "Editando serviço".to_string()
        } else {
            "Novo serviço".to_string()
        },
        String::new(),
        format!(
            "Pagamento: {}",
            match app.draft.payment_method {
                PaymentMethod::Immediate => "À VISTA",
                PaymentMethod::OnTerms => "A PRAZO",
            }
        ),
        String::new(),
    ];
    for idx in 0..count {
        let marker = if idx == app.ui.editing_field_idx {
            "→"
        } else {
            " "
        };
        let value = handlers::entry_field_value(&app.draft, idx);
        lines.push(format!("{} {}: {}", marker, handlers::ENTRY_FIELDS[idx], value));
    }

    let form = Paragraph::new(lines.join("\n"))
        .block(Block::default().borders(Borders::ALL).title("SERVIÇO"))
        .wrap(Wrap { trim: true });
    f.render_widget(form, body_layout.jobs_table);

    // Live billing preview while editing a job that already ended.
    let preview = app
        .editing_job_id
        .as_ref()
        .and_then(|id| app.jobs.iter().find(|j| &j.id == id))
        .and_then(|job| engine::preview_amount(&app.pricing, job, &app.draft))
        .map(|b| {
            format!(
                "Prévia:\n  Valor: {}\n  Hora extra: {}\n  KM extra: {}\n",
                message::format_money(b.amount),
                message::format_money(b.extra_hour_cost),
                message::format_money(b.extra_km_cost),
            )
        })
        .unwrap_or_default();
    render_info_panel(f, app, body_layout.info_panel, preview);
    render_help_bar(f, app, main_layout.help_bar);
    render_status_bar(f, app, main_layout.status_bar);
}

fn draw_settings(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    let table_rows = app.pricing_rows();
    let rows = table_rows.iter().map(|(client, service_type)| {
        let price = app
            .pricing_buf
            .get(client)
            .and_then(|p| p.get(service_type))
            .copied()
            .unwrap_or(0.0);
        Row::new(vec![
            client.clone(),
            service_type.clone(),
            message::format_money(price),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(14),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("TABELA DE PREÇOS"))
    .header(Row::new(vec!["Empresa", "Tipo", "Preço"]).bold())
    .row_highlight_style(highlight_style());

    let mut table_state = ratatui::widgets::TableState::default();
    if !table_rows.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, body_layout.jobs_table, &mut table_state);

    render_info_panel(
        f,
        app,
        body_layout.info_panel,
        "Preço 0 usa o \"default\" da empresa.\nAlterações só valem após salvar.".into(),
    );
    render_help_bar(f, app, main_layout.help_bar);
    render_status_bar(f, app, main_layout.status_bar);
}

fn active_detail(job: &Job) -> String {
    format!(
        "{} - {}\nPlaca: {} ({})\nInício: {} {}\nKM inicial: {}\nPagamento: {}\nObs: {}",
        job.client,
        job.service_type,
        job.plate,
        job.model,
        job.start_date,
        job.start_time,
        job.initial_km
            .map(|v| format!("{v:.0}"))
            .unwrap_or_else(|| "-".into()),
        payment_label(job),
        job.note,
    )
}

fn history_detail(job: &Job, today: &str) -> String {
    let overdue = if engine::is_overdue(job, today) {
        "\n*** VENCIDO ***"
    } else {
        ""
    };
    format!(
        "{} - {}\nPlaca: {} ({})\n{} {} às {} ({})\nKM rodado: {:.0}\n\n\
         Serviço: {}\nHora extra: {}\nKM extra: {}\nCustos: {}\nTotal: {}\n\
         Pagamento: {}{}",
        job.client,
        job.service_type,
        job.plate,
        job.model,
        message::format_short_date(&job.start_date),
        job.start_time,
        job.end_time.as_deref().unwrap_or("--:--"),
        message::format_duration(job.elapsed_hours.unwrap_or(0.0)),
        job.distance_km,
        message::format_money(job.amount.unwrap_or(0.0)),
        message::format_money(job.extra_hour_cost),
        message::format_money(job.extra_km_cost),
        message::format_money(job.extra_costs),
        message::format_money(job.total_due()),
        payment_label(job),
        overdue,
    )
}

/// Info panel: screen detail above, recent log lines below.
fn render_info_panel(f: &mut Frame, app: &App, area: Rect, detail: String) {
    let log: String = app
        .ui
        .log
        .iter()
        .rev()
        .take(10)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!("{detail}\n\nLog:\n{log}");
    let info_panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info_panel, area);
}

fn render_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = get_help_text(&app.ui.screen, &app.shortcuts);
    let help_bar = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("AJUDA"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let screen_name = match app.ui.screen {
        Screen::Login => "Login",
        Screen::Active => "Ativos",
        Screen::History => "Histórico",
        Screen::Entry => "Serviço",
        Screen::Settings => "Preços",
    };
    let operator = app
        .operator
        .as_ref()
        .map(|o| o.name.as_str())
        .unwrap_or("-");

    let status_text = if let Some(err) = &app.ui.error {
        format!("[{screen_name}] {operator} | ERRO: {err}")
    } else {
        format!("[{screen_name}] {operator} | {}", app.ui.status)
    };

    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }
    f.render_widget(status_bar, area);
}

/// Confirmation dialog drawn over the current screen.
fn render_confirm(f: &mut Frame, confirm: &ConfirmState) {
    let text = match confirm {
        ConfirmState::FinishNormal { draft, .. } => format!(
            "Finalizar serviço?\n\n\
             Fim: {} {}\nDuração: {}\nKM rodado: {:.0}\n\n\
             Enter=confirmar | Esc=voltar",
            draft.end_date,
            draft.end_time,
            message::format_duration(draft.elapsed_hours),
            draft.distance_km,
        ),
        ConfirmState::FinishShort { draft, .. } => format!(
            "Serviço com menos de {} minutos ({} min).\n\n\
             c=serviço real (cobrar) | v=anular (valor zero)\nEsc=voltar",
            engine::SHORT_JOB_MINUTES, draft.elapsed_minutes,
        ),
        ConfirmState::DeleteJob { .. } => {
            "Excluir este registro permanentemente?\n\ny=excluir | Esc=voltar".to_string()
        }
        ConfirmState::SignOut => "Sair da conta?\n\ny=sair | Esc=voltar".to_string(),
    };

    let height = text.lines().count() as u16 + 2;
    let area = centered_rect(f.area(), 60, height);
    f.render_widget(Clear, area);
    let dialog = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("CONFIRMAR")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(dialog, area);
}

fn centered_rect(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn get_help_text(screen: &Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Login => format!(
            "{}: email | {}: senha | {}: entrar | {}: criar conta | {}: sair",
            format_keys(&shortcuts.login.email),
            format_keys(&shortcuts.login.password),
            format_keys(&shortcuts.login.submit),
            format_keys(&shortcuts.login.register),
            format_keys(&shortcuts.login.quit),
        ),
        Screen::Active => format!(
            "{}: novo | {}: finalizar | {}: editar | {}: excluir | {}: histórico | {}: preços | {}: atualizar | {}: sair da conta | {}: sair",
            format_keys(&shortcuts.active.new_job),
            format_keys(&shortcuts.active.finish),
            format_keys(&shortcuts.active.edit),
            format_keys(&shortcuts.active.delete),
            format_keys(&shortcuts.active.history),
            format_keys(&shortcuts.active.settings),
            format_keys(&shortcuts.active.refresh),
            format_keys(&shortcuts.active.sign_out),
            format_keys(&shortcuts.active.quit),
        ),
        Screen::History => format!(
            "{}: pago/pendente | {}: mensagem | {}: editar | {}: excluir | {}: atualizar | {}: voltar",
            format_keys(&shortcuts.history.toggle_paid),
            format_keys(&shortcuts.history.message),
            format_keys(&shortcuts.history.edit),
            format_keys(&shortcuts.history.delete),
            format_keys(&shortcuts.history.refresh),
            format_keys(&shortcuts.history.back),
        ),
        Screen::Entry => format!(
            "{}: editar campo | {}/{}: navegar | {}: vista/prazo | {}: salvar | {}: cancelar",
            format_keys(&shortcuts.entry.edit_field),
            format_keys(&shortcuts.entry.next_field),
            format_keys(&shortcuts.entry.prev_field),
            format_keys(&shortcuts.entry.toggle_payment),
            format_keys(&shortcuts.entry.submit),
            format_keys(&shortcuts.entry.cancel),
        ),
        Screen::Settings => format!(
            "{}: editar preço | {}: nova empresa | {}: remover empresa | {}: salvar | {}: voltar",
            format_keys(&shortcuts.settings.edit_price),
            format_keys(&shortcuts.settings.add_client),
            format_keys(&shortcuts.settings.remove_client),
            format_keys(&shortcuts.settings.save),
            format_keys(&shortcuts.settings.cancel),
        ),
    }
}

fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Rgb(255, 140, 0))
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Active => "ATIVO",
        JobStatus::Finished => "FINALIZADO",
        JobStatus::Cancelled => "CANCELADO",
    }
}

fn payment_label(job: &Job) -> &'static str {
    match (job.payment_method, job.payment_state) {
        (_, PaymentState::Paid) => "PAGO",
        (PaymentMethod::Immediate, _) => "VISTA",
        (PaymentMethod::OnTerms, _) => "PRAZO",
    }
}
