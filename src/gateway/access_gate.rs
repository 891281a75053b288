use axum::{
    Json,
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::sink::{AuditEvent, AuditSinkState};
use crate::{
    auth::Identity,
    error::{AppError, AppResult, ErrorBody},
    models::UserRole,
    repository::DirectoryState,
};

/// Message written in the body of every 403 issued by the gate.
pub const FORBIDDEN_MESSAGE: &str = "Administrator privileges are required.";

/// Why the gate allowed or denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    AdminRole,
    RoleMismatch,
    MissingIdentity,
    DirectoryTimeout,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionReason::AdminRole => "caller holds the admin role",
            DecisionReason::RoleMismatch => "caller does not hold the admin role",
            DecisionReason::MissingIdentity => "no resolved identity on the request",
            DecisionReason::DirectoryTimeout => "user directory lookup timed out",
        };
        f.write_str(text)
    }
}

/// AccessDecision
///
/// The gate's verdict for one request. It is attached to the request extensions on the
/// allow path so later stages can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: DecisionReason,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allow: true,
            reason: DecisionReason::AdminRole,
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            allow: false,
            reason,
        }
    }
}

/// AccessGate
///
/// Pre-invocation stage for the whole admin namespace. Holds only shared, immutable
/// handles, so one instance serves every request concurrently.
#[derive(Clone)]
pub struct AccessGate {
    directory: DirectoryState,
    sink: AuditSinkState,
    lookup_timeout: Duration,
}

impl AccessGate {
    pub fn new(directory: DirectoryState, sink: AuditSinkState, lookup_timeout: Duration) -> Self {
        Self {
            directory,
            sink,
            lookup_timeout,
        }
    }

    /// check
    ///
    /// Decides whether `identity` may reach the admin route at `url`. Exactly one event is
    /// written to the sink per call.
    ///
    /// * No identity, a timed-out lookup, or a non-admin role yield a deny decision.
    /// * An identity unknown to the directory is an `InvalidRequest` error, not a denial.
    /// * Directory failures propagate unchanged.
    pub async fn check(&self, identity: Option<&Identity>, url: &str) -> AppResult<AccessDecision> {
        let timestamp = Utc::now();

        let Some(identity) = identity else {
            return Ok(self.deny(None, url, timestamp, DecisionReason::MissingIdentity));
        };
        let user_id = identity.user_id;

        let lookup = tokio::time::timeout(self.lookup_timeout, self.directory.find_user(user_id));
        let user = match lookup.await {
            Err(_) => {
                return Ok(self.deny(Some(user_id), url, timestamp, DecisionReason::DirectoryTimeout));
            }
            Ok(Err(e)) => {
                self.lookup_failed(user_id, url, timestamp);
                return Err(e);
            }
            Ok(Ok(None)) => {
                self.lookup_failed(user_id, url, timestamp);
                return Err(AppError::InvalidRequest("User not found".to_string()));
            }
            Ok(Ok(Some(user))) => user,
        };

        if user.user_role() != Some(UserRole::Admin) {
            return Ok(self.deny(Some(user_id), url, timestamp, DecisionReason::RoleMismatch));
        }

        self.sink.emit(AuditEvent::AccessGranted {
            identity: user_id,
            timestamp,
            url: url.to_string(),
        });
        Ok(AccessDecision::allow())
    }

    fn deny(
        &self,
        identity: Option<Uuid>,
        url: &str,
        timestamp: DateTime<Utc>,
        reason: DecisionReason,
    ) -> AccessDecision {
        self.sink.emit(AuditEvent::AccessDenied {
            identity,
            timestamp,
            url: url.to_string(),
            reason,
        });
        AccessDecision::deny(reason)
    }

    fn lookup_failed(&self, identity: Uuid, url: &str, timestamp: DateTime<Utc>) {
        self.sink.emit(AuditEvent::LookupFailed {
            identity,
            timestamp,
            url: url.to_string(),
        });
    }
}

/// request_url
///
/// The path the client actually requested, before any `nest` prefix was stripped.
pub fn request_url(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// enforce_admin
///
/// Middleware form of the gate. Denials are answered here with a 403 and the rest of the
/// chain is never polled; errors go to the global error boundary.
pub async fn enforce_admin(State(gate): State<AccessGate>, mut request: Request, next: Next) -> Response {
    let url = request_url(&request);
    let identity = request.extensions().get::<Identity>().copied();

    match gate.check(identity.as_ref(), &url).await {
        Ok(decision) if decision.allow => {
            request.extensions_mut().insert(decision);
            next.run(request).await
        }
        Ok(_) => (
            StatusCode::FORBIDDEN,
            Json(ErrorBody::new(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
