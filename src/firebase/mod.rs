//! Firebase REST collaborators.

/// Identity provider: email/password auth over the identitytoolkit API.
pub mod auth;
/// Firestore document CRUD and wire mapping.
pub mod firestore;
/// Refresh-token persistence for session resume.
pub mod session_store;
