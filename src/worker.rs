//! Background worker handling authentication and Firestore sync.
//!
//! The UI never performs I/O; it sends [`WorkerCmd`]s and consumes
//! [`WorkerEvent`]s. Commands are processed one at a time, and a poll timer
//! re-fetches the full job set so remote edits eventually show up.

use crate::{
    config::Config,
    firebase::{
        auth::{self, Session},
        firestore::FirestoreStore,
        session_store::{SavedSession, SessionStore},
    },
    jobs::{Job, JobPatch},
    pricing::PriceTable,
    store::JobStore,
};
use anyhow::Result;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Authenticate; `register` creates the account first.
    SignIn {
        email: String,
        password: String,
        register: bool,
    },
    /// Drop the session and forget the saved refresh token.
    SignOut,
    /// Re-fetch the full job set now.
    RefreshJobs,
    /// Create a new job document (id already assigned).
    CreateJob(Job),
    /// Apply a partial update to one job.
    UpdateJob { id: String, patch: JobPatch },
    /// Delete one job document.
    DeleteJob { id: String },
    /// Replace the operator's price table.
    SavePricing(PriceTable),
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Session established (fresh sign-in or resume).
    SignedIn {
        uid: String,
        email: String,
        operator: String,
    },
    /// Session dropped.
    SignedOut,
    /// Full job snapshot; replaces whatever the UI holds.
    JobsLoaded(Vec<Job>),
    /// Operator's stored price table; replaces the UI's table wholesale.
    PricingLoaded(PriceTable),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Live connection: the session shared with the store, plus the store.
struct Conn {
    session: Arc<RwLock<Session>>,
    store: FirestoreStore,
}

impl Conn {
    async fn uid(&self) -> String {
        self.session.read().await.uid.clone()
    }
}

/// Main worker loop: resume a saved session if possible, then handle
/// commands sequentially alongside the poll timer.
pub async fn run(mut rx: mpsc::Receiver<WorkerCmd>, tx: mpsc::Sender<WorkerEvent>, cfg: Config) {
    let http = Client::new();
    let session_store = SessionStore::new("token.json");
    tracing::info!("worker started");

    let mut conn: Option<Conn> = None;

    // Resume: a saved refresh token is exchanged for a fresh session.
    if cfg.is_complete()
        && let Some(saved) = session_store.load().await
    {
        tracing::info!("resuming saved session for {}", saved.email);
        match auth::refresh(&http, &cfg.firebase.api_key, &saved.refresh_token).await {
            Ok(session) => {
                conn = Some(connect(&http, &cfg, &session_store, session, &tx).await);
            }
            Err(e) => {
                tracing::warn!("session resume failed: {e}");
                let _ = session_store.clear().await;
            }
        }
    }

    let mut poll = tokio::time::interval(Duration::from_secs(cfg.sync.poll_secs.max(5)));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; the resume path already fetched.
    poll.tick().await;

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_cmd(cmd, &http, &cfg, &session_store, &mut conn, &tx).await;
            }
            _ = poll.tick() => {
                if let Some(c) = &conn {
                    keep_fresh(c, &http, &cfg, &session_store).await;
                    push_jobs(c, &tx).await;
                }
            }
        }
    }
    tracing::info!("worker stopped");
}

async fn handle_cmd(
    cmd: WorkerCmd,
    http: &Client,
    cfg: &Config,
    session_store: &SessionStore,
    conn: &mut Option<Conn>,
    tx: &mpsc::Sender<WorkerEvent>,
) {
    match cmd {
        WorkerCmd::SignIn {
            email,
            password,
            register,
        } => {
            if !cfg.is_complete() {
                let _ = tx
                    .send(WorkerEvent::Error(
                        "config.toml is missing the Firebase api_key/project_id".into(),
                    ))
                    .await;
                return;
            }
            tracing::info!(register, "sign-in requested for {email}");
            let attempt = if register {
                auth::sign_up(http, &cfg.firebase.api_key, &email, &password).await
            } else {
                auth::sign_in(http, &cfg.firebase.api_key, &email, &password).await
            };
            match attempt {
                Ok(session) => {
                    *conn = Some(connect(http, cfg, session_store, session, tx).await);
                }
                Err(e) => {
                    tracing::warn!("sign-in failed: {e}");
                    let _ = tx.send(WorkerEvent::Error(e.to_string())).await;
                }
            }
        }

        WorkerCmd::SignOut => {
            tracing::info!("sign-out");
            *conn = None;
            if let Err(e) = session_store.clear().await {
                tracing::warn!("could not remove saved session: {e}");
            }
            let _ = tx.send(WorkerEvent::SignedOut).await;
        }

        WorkerCmd::RefreshJobs => {
            let Some(c) = conn else {
                let _ = tx.send(WorkerEvent::Error("not signed in".into())).await;
                return;
            };
            keep_fresh(c, http, cfg, session_store).await;
            push_jobs(c, tx).await;
        }

        WorkerCmd::CreateJob(job) => {
            let Some(c) = conn else {
                let _ = tx.send(WorkerEvent::Error("not signed in".into())).await;
                return;
            };
            keep_fresh(c, http, cfg, session_store).await;
            match c.store.create_job(&job).await {
                Ok(()) => {
                    tracing::info!("job created: {}", job.id);
                    let _ = tx
                        .send(WorkerEvent::Log(format!(
                            "registrado: {} {}",
                            job.client, job.plate
                        )))
                        .await;
                    push_jobs(c, tx).await;
                }
                Err(e) => {
                    tracing::error!("create failed: {e}");
                    let _ = tx.send(WorkerEvent::Error(format!("create failed: {e}"))).await;
                }
            }
        }

        WorkerCmd::UpdateJob { id, patch } => {
            let Some(c) = conn else {
                let _ = tx.send(WorkerEvent::Error("not signed in".into())).await;
                return;
            };
            keep_fresh(c, http, cfg, session_store).await;
            match c.store.update_job(&id, &patch).await {
                Ok(()) => {
                    tracing::info!("job updated: {id}");
                    push_jobs(c, tx).await;
                }
                Err(e) => {
                    tracing::error!("update failed: {id}: {e}");
                    let _ = tx.send(WorkerEvent::Error(format!("update failed: {e}"))).await;
                }
            }
        }

        WorkerCmd::DeleteJob { id } => {
            let Some(c) = conn else {
                let _ = tx.send(WorkerEvent::Error("not signed in".into())).await;
                return;
            };
            keep_fresh(c, http, cfg, session_store).await;
            match c.store.delete_job(&id).await {
                Ok(()) => {
                    tracing::info!("job deleted: {id}");
                    let _ = tx.send(WorkerEvent::Log("registro excluído".into())).await;
                    push_jobs(c, tx).await;
                }
                Err(e) => {
                    tracing::error!("delete failed: {id}: {e}");
                    let _ = tx.send(WorkerEvent::Error(format!("delete failed: {e}"))).await;
                }
            }
        }

        WorkerCmd::SavePricing(table) => {
            let Some(c) = conn else {
                let _ = tx.send(WorkerEvent::Error("not signed in".into())).await;
                return;
            };
            keep_fresh(c, http, cfg, session_store).await;
            let uid = c.uid().await;
            match c.store.save_pricing(&uid, &table).await {
                Ok(()) => {
                    tracing::info!("pricing saved");
                    let _ = tx.send(WorkerEvent::Log("tabela de preços salva".into())).await;
                    let _ = tx.send(WorkerEvent::PricingLoaded(table)).await;
                }
                Err(e) => {
                    tracing::error!("pricing save failed: {e}");
                    let _ = tx
                        .send(WorkerEvent::Error(format!("pricing save failed: {e}")))
                        .await;
                }
            }
        }
    }
}

/// Wrap a fresh session into a connection, persist it, and push the
/// initial pricing + job snapshot.
async fn connect(
    http: &Client,
    cfg: &Config,
    session_store: &SessionStore,
    session: Session,
    tx: &mpsc::Sender<WorkerEvent>,
) -> Conn {
    tracing::info!("signed in as {} ({})", session.email, session.uid);
    if let Err(e) = session_store
        .save(&SavedSession {
            refresh_token: session.refresh_token.clone(),
            email: session.email.clone(),
        })
        .await
    {
        tracing::warn!("could not persist session: {e}");
    }
    let _ = tx
        .send(WorkerEvent::SignedIn {
            uid: session.uid.clone(),
            email: session.email.clone(),
            operator: session.operator_name().to_string(),
        })
        .await;

    let uid = session.uid.clone();
    let shared = Arc::new(RwLock::new(session));
    let conn = Conn {
        store: FirestoreStore::new(http.clone(), cfg.firebase.clone(), Arc::clone(&shared)),
        session: shared,
    };

    match conn.store.load_pricing(&uid).await {
        Ok(Some(table)) => {
            let _ = tx.send(WorkerEvent::PricingLoaded(table)).await;
        }
        Ok(None) => tracing::info!("no stored pricing; defaults apply"),
        Err(e) => {
            tracing::warn!("pricing load failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("pricing load failed: {e}")))
                .await;
        }
    }
    push_jobs(&conn, tx).await;
    conn
}

/// Renew the id token shortly before it expires and persist the rotated
/// refresh token. Failures are logged; the next call surfaces the error.
async fn keep_fresh(conn: &Conn, http: &Client, cfg: &Config, session_store: &SessionStore) {
    let refresh_token = {
        let s = conn.session.read().await;
        if !s.needs_refresh() {
            return;
        }
        s.refresh_token.clone()
    };
    match auth::refresh(http, &cfg.firebase.api_key, &refresh_token).await {
        Ok(fresh) => {
            tracing::info!("id token renewed");
            if let Err(e) = session_store
                .save(&SavedSession {
                    refresh_token: fresh.refresh_token.clone(),
                    email: fresh.email.clone(),
                })
                .await
            {
                tracing::warn!("could not persist session: {e}");
            }
            *conn.session.write().await = fresh;
        }
        Err(e) => tracing::warn!("token renewal failed: {e}"),
    }
}

/// Fetch the full job set for the signed-in operator and hand it to the UI.
async fn push_jobs(conn: &Conn, tx: &mpsc::Sender<WorkerEvent>) {
    let uid = conn.uid().await;
    match fetch(conn, &uid).await {
        Ok(jobs) => {
            tracing::debug!("loaded {} jobs", jobs.len());
            let _ = tx.send(WorkerEvent::JobsLoaded(jobs)).await;
        }
        Err(e) => {
            tracing::error!("job fetch failed: {e}");
            let _ = tx.send(WorkerEvent::Error(format!("fetch failed: {e}"))).await;
        }
    }
}

async fn fetch(conn: &Conn, uid: &str) -> Result<Vec<Job>> {
    conn.store.fetch_jobs(uid).await
}
