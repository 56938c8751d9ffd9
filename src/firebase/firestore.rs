//! Cloud Firestore REST adapter and the job wire mapping.
//!
//! Documents keep the historical field names (`empresa`, `tipo`,
//! `data_inicio`, ...) so the data stays readable by the operator's older
//! tooling. Money and hour totals are stored as two-decimal strings, the
//! format the legacy documents already use; kilometre fields are doubles.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::auth::Session;
use crate::config::FirebaseCfg;
use crate::jobs::{Job, JobPatch, JobStatus, PaymentMethod, PaymentState};
use crate::pricing::PriceTable;
use crate::store::JobStore;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

/// Firestore-backed implementation of [`JobStore`].
#[derive(Clone)]
pub struct FirestoreStore {
    http: Client,
    cfg: FirebaseCfg,
    /// Shared with the worker, which renews the id token before expiry.
    session: Arc<RwLock<Session>>,
}

impl FirestoreStore {
    pub fn new(http: Client, cfg: FirebaseCfg, session: Arc<RwLock<Session>>) -> Self {
        Self { http, cfg, session }
    }

    fn documents_base(&self) -> String {
        format!(
            "{FIRESTORE_BASE}/projects/{}/databases/(default)/documents",
            self.cfg.project_id
        )
    }

    async fn token(&self) -> String {
        self.session.read().await.id_token.clone()
    }
}

#[async_trait]
impl JobStore for FirestoreStore {
    async fn fetch_jobs(&self, uid: &str) -> Result<Vec<Job>> {
        // Filter by owner only; ordering is done client-side to avoid a
        // composite index requirement.
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.cfg.jobs_collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "uid" },
                        "op": "EQUAL",
                        "value": { "stringValue": uid },
                    }
                },
            }
        });
        let url = format!("{}:runQuery", self.documents_base());
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.token().await)
            .json(&body)
            .send()
            .await?;
        let rows = ensure_success(resp).await?.json::<Vec<Value>>().await?;

        let mut jobs = Vec::new();
        for row in rows {
            // runQuery interleaves progress rows without a document.
            let Some(doc) = row.get("document") else {
                continue;
            };
            match doc_to_job(doc) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("skipping malformed job document: {e}"),
            }
        }
        Ok(jobs)
    }

    async fn create_job(&self, job: &Job) -> Result<()> {
        let url = format!(
            "{}/{}?documentId={}",
            self.documents_base(),
            self.cfg.jobs_collection,
            urlencoding::encode(&job.id)
        );
        let body = json!({ "fields": job_to_fields(job) });
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.token().await)
            .json(&body)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<()> {
        let (fields, mask) = patch_to_fields(patch);
        if mask.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/{}/{}",
            self.documents_base(),
            self.cfg.jobs_collection,
            urlencoding::encode(id)
        );
        let query: Vec<(&str, &str)> = mask
            .iter()
            .map(|p| ("updateMask.fieldPaths", p.as_str()))
            .collect();
        let body = json!({ "fields": fields });
        let resp = self
            .http
            .patch(url)
            .query(&query)
            .bearer_auth(self.token().await)
            .json(&body)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<()> {
        let url = format!(
            "{}/{}/{}",
            self.documents_base(),
            self.cfg.jobs_collection,
            urlencoding::encode(id)
        );
        let resp = self
            .http
            .delete(url)
            .bearer_auth(self.token().await)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn load_pricing(&self, uid: &str) -> Result<Option<PriceTable>> {
        let url = format!("{}/users/{}/settings/pricing", self.documents_base(), uid);
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token().await)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc = ensure_success(resp).await?.json::<Value>().await?;
        Ok(Some(doc_to_pricing(&doc)))
    }

    async fn save_pricing(&self, uid: &str, table: &PriceTable) -> Result<()> {
        let url = format!("{}/users/{}/settings/pricing", self.documents_base(), uid);
        // No field mask: the settings document is replaced wholesale.
        let body = json!({ "fields": pricing_to_fields(table) });
        let resp = self
            .http
            .patch(url)
            .bearer_auth(self.token().await)
            .json(&body)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

/// Convert non-2xx responses into a structured error.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("HTTP status {status} error: {body}"))
}

// --- typed value helpers -------------------------------------------------

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn double_value(v: f64) -> Value {
    json!({ "doubleValue": v })
}

fn null_value() -> Value {
    json!({ "nullValue": null })
}

/// Two-decimal string encoding used by the legacy money/hour fields.
fn money_value(v: f64) -> Value {
    string_value(&format!("{v:.2}"))
}

fn get_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

/// Read a numeric field regardless of how it was written: as a double, an
/// integer, or a legacy numeric string.
fn get_f64(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let v = fields.get(key)?;
    if let Some(d) = v.get("doubleValue") {
        return d.as_f64().or_else(|| d.as_str()?.parse().ok());
    }
    if let Some(i) = v.get("integerValue") {
        return i.as_str()?.parse().ok();
    }
    v.get("stringValue")?.as_str()?.trim().parse().ok()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

// --- job mapping ----------------------------------------------------------

/// Encode a full job for document creation.
fn job_to_fields(job: &Job) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("uid".into(), string_value(&job.uid));
    fields.insert("email".into(), string_value(&job.email));
    fields.insert("empresa".into(), string_value(&job.client));
    fields.insert("tipo".into(), string_value(&job.service_type));
    fields.insert("placa".into(), string_value(&job.plate));
    fields.insert("modelo".into(), string_value(&job.model));
    fields.insert("data_inicio".into(), string_value(&job.start_date));
    fields.insert("hora_inicio".into(), string_value(&job.start_time));
    fields.insert(
        "km_inicial".into(),
        job.initial_km.map(double_value).unwrap_or_else(null_value),
    );
    fields.insert("custos".into(), double_value(job.extra_costs));
    fields.insert("pagamento".into(), string_value(job.payment_method.as_wire()));
    fields.insert(
        "pagamento_status".into(),
        string_value(job.payment_state.as_wire()),
    );
    fields.insert(
        "prazo_pagamento".into(),
        job.due_date
            .as_deref()
            .map(string_value)
            .unwrap_or_else(null_value),
    );
    fields.insert("status".into(), string_value(job.status.as_wire()));
    fields.insert("obs".into(), string_value(&job.note));
    fields.insert("created_at".into(), string_value(&job.created_at));
    fields
}

/// Encode a partial update plus its field mask.
fn patch_to_fields(patch: &JobPatch) -> (Map<String, Value>, Vec<String>) {
    let mut fields = Map::new();
    let mut mask = Vec::new();
    let mut put = |key: &str, value: Value, mask: &mut Vec<String>| {
        fields.insert(key.to_string(), value);
        mask.push(key.to_string());
    };

    if let Some(v) = &patch.client {
        put("empresa", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.service_type {
        put("tipo", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.plate {
        put("placa", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.model {
        put("modelo", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.start_date {
        put("data_inicio", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.start_time {
        put("hora_inicio", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.note {
        put("obs", string_value(v), &mut mask);
    }
    if let Some(v) = patch.payment_method {
        put("pagamento", string_value(v.as_wire()), &mut mask);
    }
    if let Some(v) = patch.payment_state {
        put("pagamento_status", string_value(v.as_wire()), &mut mask);
    }
    if let Some(v) = &patch.due_date {
        let value = v.as_deref().map(string_value).unwrap_or_else(null_value);
        put("prazo_pagamento", value, &mut mask);
    }
    if let Some(v) = patch.extra_costs {
        put("custos", double_value(v), &mut mask);
    }
    if let Some(v) = patch.initial_km {
        let value = v.map(double_value).unwrap_or_else(null_value);
        put("km_inicial", value, &mut mask);
    }
    if let Some(v) = &patch.end_date {
        put("data_fim", string_value(v), &mut mask);
    }
    if let Some(v) = &patch.end_time {
        put("hora_fim", string_value(v), &mut mask);
    }
    if let Some(v) = patch.elapsed_hours {
        put("total_horas", money_value(v), &mut mask);
    }
    if let Some(v) = patch.distance_km {
        put("km_rodado", double_value(v), &mut mask);
    }
    if let Some(v) = patch.final_km {
        let value = v.map(double_value).unwrap_or_else(null_value);
        put("km_final", value, &mut mask);
    }
    if let Some(v) = patch.amount {
        put("valor_final", money_value(v), &mut mask);
    }
    if let Some(v) = patch.extra_hour_cost {
        put("custo_hora_extra", money_value(v), &mut mask);
    }
    if let Some(v) = patch.extra_km_cost {
        put("custo_km_extra", money_value(v), &mut mask);
    }
    if let Some(v) = patch.status {
        put("status", string_value(v.as_wire()), &mut mask);
    }

    (fields, mask)
}

/// Decode one Firestore document into a job.
fn doc_to_job(doc: &Value) -> Result<Job> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("document without a name"))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let empty = Map::new();
    let fields = doc
        .get("fields")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    Ok(Job {
        id,
        uid: get_str(fields, "uid").unwrap_or_default(),
        email: get_str(fields, "email").unwrap_or_default(),
        client: get_str(fields, "empresa").unwrap_or_default(),
        service_type: get_str(fields, "tipo").unwrap_or_default(),
        plate: get_str(fields, "placa").unwrap_or_default(),
        model: get_str(fields, "modelo").unwrap_or_default(),
        start_date: get_str(fields, "data_inicio").unwrap_or_default(),
        start_time: get_str(fields, "hora_inicio").unwrap_or_default(),
        end_date: non_empty(get_str(fields, "data_fim")),
        end_time: non_empty(get_str(fields, "hora_fim")),
        elapsed_hours: get_f64(fields, "total_horas"),
        initial_km: get_f64(fields, "km_inicial"),
        final_km: get_f64(fields, "km_final"),
        distance_km: get_f64(fields, "km_rodado").unwrap_or(0.0),
        extra_costs: get_f64(fields, "custos").unwrap_or(0.0),
        amount: get_f64(fields, "valor_final"),
        extra_hour_cost: get_f64(fields, "custo_hora_extra").unwrap_or(0.0),
        extra_km_cost: get_f64(fields, "custo_km_extra").unwrap_or(0.0),
        payment_method: PaymentMethod::from_wire(
            &get_str(fields, "pagamento").unwrap_or_default(),
        ),
        payment_state: PaymentState::from_wire(
            &get_str(fields, "pagamento_status").unwrap_or_default(),
        ),
        due_date: non_empty(get_str(fields, "prazo_pagamento")),
        status: JobStatus::from_wire(&get_str(fields, "status").unwrap_or_default()),
        note: get_str(fields, "obs").unwrap_or_default(),
        created_at: get_str(fields, "created_at").unwrap_or_default(),
    })
}

// --- pricing mapping -------------------------------------------------------

/// Encode the price table: one map value per client.
fn pricing_to_fields(table: &PriceTable) -> Map<String, Value> {
    let mut fields = Map::new();
    for (client, prices) in table {
        let mut inner = Map::new();
        for (service_type, price) in prices {
            inner.insert(service_type.clone(), double_value(*price));
        }
        fields.insert(client.clone(), json!({ "mapValue": { "fields": inner } }));
    }
    fields
}

/// Decode the settings document into a price table. Malformed entries are
/// skipped rather than failing the whole load.
fn doc_to_pricing(doc: &Value) -> PriceTable {
    let mut table = PriceTable::new();
    let Some(fields) = doc.get("fields").and_then(Value::as_object) else {
        return table;
    };
    for (client, value) in fields {
        let Some(inner) = value
            .get("mapValue")
            .and_then(|m| m.get("fields"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let mut prices = std::collections::BTreeMap::new();
        for (service_type, _) in inner {
            if let Some(p) = get_f64(inner, service_type) {
                prices.insert(service_type.clone(), p);
            }
        }
        table.insert(client.clone(), prices);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_mask_matches_present_fields() {
        let patch = JobPatch {
            status: Some(JobStatus::Finished),
            amount: Some(215.0),
            elapsed_hours: Some(4.5),
            due_date: Some(None),
            ..JobPatch::default()
        };
        let (fields, mask) = patch_to_fields(&patch);
        assert_eq!(mask.len(), 4);
        assert!(mask.contains(&"status".to_string()));
        assert!(mask.contains(&"prazo_pagamento".to_string()));
        // Money fields travel as two-decimal strings.
        assert_eq!(fields["valor_final"]["stringValue"], "215.00");
        assert_eq!(fields["total_horas"]["stringValue"], "4.50");
        assert!(fields["prazo_pagamento"].get("nullValue").is_some());
    }

    #[test]
    fn decodes_legacy_numeric_strings() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/servicos/abc123",
            "fields": {
                "empresa": { "stringValue": "RVS" },
                "tipo": { "stringValue": "ROUBO/FURTO" },
                "status": { "stringValue": "FINALIZADO" },
                "valor_final": { "stringValue": "215.00" },
                "total_horas": { "stringValue": "4.50" },
                "km_rodado": { "integerValue": "70" },
                "custos": { "doubleValue": 12.5 },
                "pagamento": { "stringValue": "PRAZO" },
                "pagamento_status": { "stringValue": "PAGO" },
            }
        });
        let job = doc_to_job(&doc).unwrap();
        assert_eq!(job.id, "abc123");
        assert_eq!(job.amount, Some(215.0));
        assert_eq!(job.elapsed_hours, Some(4.5));
        assert_eq!(job.distance_km, 70.0);
        assert_eq!(job.extra_costs, 12.5);
        assert_eq!(job.payment_method, PaymentMethod::OnTerms);
        assert_eq!(job.payment_state, PaymentState::Paid);
        assert_eq!(job.status, JobStatus::Finished);
    }

    #[test]
    fn pricing_round_trips_through_map_values() {
        let mut table = PriceTable::new();
        table.insert(
            "Sancor".into(),
            std::collections::BTreeMap::from([
                ("default".to_string(), 150.0),
                ("ALARME".to_string(), 50.0),
            ]),
        );
        let doc = json!({ "fields": pricing_to_fields(&table) });
        assert_eq!(doc_to_pricing(&doc), table);
    }
}
