//! Payment-reminder message for overdue jobs and small display formatters.

use crate::jobs::Job;

/// Format a `YYYY-MM-DD` date as `DD/MM` for display.
pub fn format_short_date(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    match parts.as_slice() {
        [_, month, day] => format!("{day}/{month}"),
        _ => date.to_string(),
    }
}

/// Format decimal hours as `Hh MMm`.
pub fn format_duration(decimal_hours: f64) -> String {
    let hours = decimal_hours.floor() as i64;
    let minutes = ((decimal_hours - hours as f64) * 60.0).round() as i64;
    format!("{hours}h {minutes:02}m")
}

/// Format a money value the way the operator's pt-BR audience reads it,
/// with a decimal comma. The wire format keeps the dot.
pub fn format_money(v: f64) -> String {
    format!("R$ {v:.2}").replace('.', ",")
}

/// Build the collection (payment reminder) message for an overdue job.
///
/// `hour` is the local hour of day and only selects the greeting. The text
/// mirrors what the operator sends over WhatsApp, so the wording stays in
/// Portuguese.
pub fn collection_message(job: &Job, hour: u32) -> String {
    let greeting = if hour >= 18 { "Boa noite" } else { "Bom dia" };
    let amount = job.amount.unwrap_or(0.0);
    let total = job.total_due();
    let due = job
        .due_date
        .as_deref()
        .map(format_short_date)
        .unwrap_or_default();
    let duration = format_duration(job.elapsed_hours.unwrap_or(0.0));
    let end_time = job.end_time.as_deref().unwrap_or("--:--");

    let costs_block = if job.extra_costs > 0.0 {
        format!(
            "\n💰 Serviço: {}\n📝 Custos Extras: {}",
            format_money(amount),
            format_money(job.extra_costs)
        )
    } else {
        String::new()
    };

    format!(
        "{greeting}, tudo bem?\n\
         Passando para lembrar do pagamento referente ao serviço da placa *{plate}* ({model}).\n\
         \n\
         📅 Data: {date}\n\
         ⏰ Horário: {start} às {end} ({duration})\n\
         {costs}\
         💲 *Valor Total: {total}*\n\
         ⚠️ Vencimento: *{due}*\n\
         \n\
         Estou à disposição caso precise de algo. Obrigado!",
        plate = job.plate,
        model = job.model,
        date = format_short_date(&job.start_date),
        start = job.start_time,
        end = end_time,
        duration = duration,
        costs = costs_block,
        total = format_money(total),
        due = due,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, JobStatus, PaymentMethod, PaymentState};

    fn overdue_job() -> Job {
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
            end_date: Some("2026-03-10".into()),
            end_time: Some("12:30".into()),
            elapsed_hours: Some(4.5),
            initial_km: None,
            final_km: None,
            distance_km: 70.0,
            extra_costs: 25.0,
            amount: Some(215.0),
            extra_hour_cost: 45.0,
            extra_km_cost: 20.0,
            payment_method: PaymentMethod::OnTerms,
            payment_state: PaymentState::Pending,
            due_date: Some("2026-04-09".into()),
            status: JobStatus::Finished,
            note: String::new(),
            created_at: "2026-03-10T08:00:00Z".into(),
        }
    }

    #[test]
    fn duration_and_date_formatting() {
        assert_eq!(format_duration(4.5), "4h 30m");
        assert_eq!(format_duration(0.08), "0h 05m");
        assert_eq!(format_short_date("2026-04-09"), "09/04");
    }

    #[test]
    fn money_uses_decimal_comma() {
        assert_eq!(format_money(215.0), "R$ 215,00");
        assert_eq!(format_money(0.5), "R$ 0,50");
    }

    #[test]
    fn message_includes_totals_and_due_date() {
        let msg = collection_message(&overdue_job(), 9);
        assert!(msg.starts_with("Bom dia"));
        assert!(msg.contains("*ABC1D23*"));
        assert!(msg.contains("R$ 240,00")); // 215 + 25 extra costs
        assert!(msg.contains("09/04"));
        assert!(msg.contains("4h 30m"));
        assert!(msg.contains("Custos Extras: R$ 25,00"));
    }

    #[test]
    fn evening_greeting_after_18() {
        let msg = collection_message(&overdue_job(), 19);
        assert!(msg.starts_with("Boa noite"));
    }
}
