//! Firebase Authentication over the identitytoolkit REST API.
//!
//! The core only needs a stable owner uid and a display name/e-mail per
//! session; credential handling stays inside this module.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";

/// An authenticated operator session.
#[derive(Clone, Debug)]
pub struct Session {
    /// Stable owner id; every job document is filtered by it.
    pub uid: String,
    pub email: String,
    /// Display name, defaulted from the e-mail local part at registration.
    pub display_name: String,
    /// Bearer token for Firestore calls.
    pub id_token: String,
    /// Long-lived token used to mint new id tokens.
    pub refresh_token: String,
    /// When the current id token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the id token should be refreshed before the next call.
    pub fn needs_refresh(&self) -> bool {
        // Refresh a few minutes early so in-flight calls never expire.
        Utc::now() + Duration::minutes(5) >= self.expires_at
    }

    /// Name shown in the operator header.
    pub fn operator_name(&self) -> &str {
        if self.display_name.is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResp {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResp {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResp {
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: String,
}

fn expires_at(expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}

fn session_from_sign_in(resp: SignInResp) -> Session {
    Session {
        uid: resp.local_id,
        email: resp.email,
        display_name: resp.display_name,
        id_token: resp.id_token,
        refresh_token: resp.refresh_token,
        expires_at: expires_at(&resp.expires_in),
    }
}

/// Sign in with e-mail and password.
pub async fn sign_in(http: &Client, api_key: &str, email: &str, password: &str) -> Result<Session> {
    let url = format!("{IDENTITY_BASE}/accounts:signInWithPassword?key={api_key}");
    let body = serde_json::json!({
        "email": email,
        "password": password,
        "returnSecureToken": true,
    });
    let resp = ensure_auth_success(http.post(url).json(&body).send().await?).await?;
    Ok(session_from_sign_in(resp.json::<SignInResp>().await?))
}

/// Register a new operator account and set the display name from the
/// e-mail local part, matching the sign-in header expectations.
pub async fn sign_up(http: &Client, api_key: &str, email: &str, password: &str) -> Result<Session> {
    let url = format!("{IDENTITY_BASE}/accounts:signUp?key={api_key}");
    let body = serde_json::json!({
        "email": email,
        "password": password,
        "returnSecureToken": true,
    });
    let resp = ensure_auth_success(http.post(url).json(&body).send().await?).await?;
    let mut session = session_from_sign_in(resp.json::<SignInResp>().await?);

    let name = email.split('@').next().unwrap_or(email).to_string();
    let update_url = format!("{IDENTITY_BASE}/accounts:update?key={api_key}");
    let update = serde_json::json!({
        "idToken": session.id_token,
        "displayName": name,
        "returnSecureToken": false,
    });
    // Profile update is best effort; the session is already valid.
    if let Err(e) = ensure_auth_success(http.post(update_url).json(&update).send().await?).await {
        tracing::warn!("display name update failed: {e}");
    }
    session.display_name = name;
    Ok(session)
}

/// Exchange a refresh token for a fresh session (used for resume and for
/// renewing the id token before expiry).
pub async fn refresh(http: &Client, api_key: &str, refresh_token: &str) -> Result<Session> {
    let url = format!("{SECURE_TOKEN_BASE}/token?key={api_key}");
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    let resp = ensure_auth_success(http.post(url).form(&form).send().await?).await?;
    let resp = resp.json::<RefreshResp>().await?;

    // The token endpoint does not return profile data; look it up.
    let lookup_url = format!("{IDENTITY_BASE}/accounts:lookup?key={api_key}");
    let lookup_body = serde_json::json!({ "idToken": resp.id_token });
    let lookup = ensure_auth_success(http.post(lookup_url).json(&lookup_body).send().await?)
        .await?
        .json::<LookupResp>()
        .await?;
    let user = lookup
        .users
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("account lookup returned no user"))?;

    Ok(Session {
        uid: resp.user_id,
        email: user.email,
        display_name: user.display_name,
        id_token: resp.id_token,
        refresh_token: resp.refresh_token,
        expires_at: expires_at(&resp.expires_in),
    })
}

/// Shape of identitytoolkit error payloads.
#[derive(Debug, Deserialize)]
struct AuthErrorResp {
    error: AuthErrorBody,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    message: String,
}

/// Convert non-2xx auth responses into operator-readable errors.
async fn ensure_auth_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let code = serde_json::from_str::<AuthErrorResp>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {status}"));
    Err(anyhow!("{}", translate_error(&code)))
}

/// Map identitytoolkit error codes to the messages shown to the operator.
fn translate_error(code: &str) -> String {
    match code {
        "INVALID_EMAIL" => "Email inválido.".into(),
        "USER_DISABLED" => "Usuário desativado.".into(),
        "EMAIL_NOT_FOUND" => "Usuário não encontrado.".into(),
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Senha incorreta.".into(),
        "EMAIL_EXISTS" => "Email já está em uso.".into(),
        code if code.starts_with("WEAK_PASSWORD") => "Senha muito fraca (min 6 digitos).".into(),
        other => format!("Erro ao acessar ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_error_codes_are_translated() {
        assert_eq!(translate_error("EMAIL_NOT_FOUND"), "Usuário não encontrado.");
        assert_eq!(
            translate_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            "Senha muito fraca (min 6 digitos)."
        );
        assert!(translate_error("SOMETHING_ELSE").contains("SOMETHING_ELSE"));
    }

    #[test]
    fn operator_name_falls_back_to_email_local_part() {
        let session = Session {
            uid: "u1".into(),
            email: "viking@example.com".into(),
            display_name: String::new(),
            id_token: "t".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now(),
        };
        assert_eq!(session.operator_name(), "viking");
    }
}
