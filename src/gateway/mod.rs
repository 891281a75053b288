//! The admin-route gateway pipeline.
//!
//! Two stages sit between authentication and the admin handlers:
//!
//! ```text
//! authenticate ─▶ enforce_admin (every /admin route) ─▶ audit_invocation (allow-list only) ─▶ handler
//! ```
//!
//! Both stages are plain axum middleware built once at startup; `Next` is the capability
//! each stage uses to continue the chain.

pub mod access_gate;
pub mod auditor;
pub mod body_extractor;
pub mod sink;

pub use access_gate::{AccessDecision, AccessGate, DecisionReason, enforce_admin};
pub use auditor::{AuditedRoute, RequestResponseAuditor, audit_invocation};
pub use body_extractor::{AUDITED_OPERATIONS, AuditedOperation, OperationSignature};
pub use sink::{AuditEvent, AuditRecord, AuditSink, AuditSinkState, MemoryAuditSink, TracingAuditSink};
