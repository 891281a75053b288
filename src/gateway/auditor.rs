use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::{
    access_gate::request_url,
    body_extractor::{
        AuditedOperation, OperationSignature, ParamSource, ResultBody, extract_request_payload,
        extract_response_payload,
    },
    sink::{AuditEvent, AuditRecord, AuditSinkState},
};
use crate::{
    auth::Identity,
    error::{AppError, AppResult},
};

/// Largest request or response body the auditor will buffer.
pub const MAX_AUDITED_BODY_BYTES: usize = 2 * 1024 * 1024;

/// RequestResponseAuditor
///
/// Around-invocation stage for the audit allow-list. One instance is built at startup and
/// bound to each audited route through [`RequestResponseAuditor::route`].
#[derive(Clone)]
pub struct RequestResponseAuditor {
    sink: AuditSinkState,
}

impl RequestResponseAuditor {
    pub fn new(sink: AuditSinkState) -> Self {
        Self { sink }
    }

    pub fn route(&self, operation: AuditedOperation) -> AuditedRoute {
        AuditedRoute {
            auditor: self.clone(),
            signature: operation.signature(),
        }
    }
}

/// AuditedRoute
///
/// Middleware state for one audited route: the shared auditor plus the operation's
/// declared signature.
#[derive(Clone)]
pub struct AuditedRoute {
    auditor: RequestResponseAuditor,
    signature: &'static OperationSignature,
}

/// audit_invocation
///
/// Wraps one audited handler call.
///
/// 1. The request payload is extracted before the handler runs. A failure here rejects the
///    request and the handler is never invoked.
/// 2. The handler runs exactly once.
/// 3. A non-success response is returned untouched and nothing is recorded.
/// 4. On success the response payload is read from the envelope `body` and a single
///    `AuditRecord` is emitted. A failure here replaces the response with a 500 and no
///    record is written.
pub async fn audit_invocation(
    State(route): State<AuditedRoute>,
    path_params: RawPathParams,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .map(|identity| identity.user_id)
        .ok_or_else(|| AppError::Internal("audited route reached without an identity".to_string()))?;
    let url = request_url(&request);
    let timestamp = Utc::now();

    let (parts, body) = request.into_parts();
    let request_bytes = to_bytes(body, MAX_AUDITED_BODY_BYTES)
        .await
        .map_err(|_| AppError::InvalidRequest("Request body could not be read".to_string()))?;

    let arguments = collect_arguments(route.signature, &path_params, &request_bytes);
    let request_payload = extract_request_payload(route.signature, &arguments)?;

    let response = next
        .run(Request::from_parts(parts, Body::from(request_bytes)))
        .await;

    if !response.status().is_success() {
        tracing::debug!(
            url = %url,
            status = %response.status(),
            "audited operation failed, no audit record written"
        );
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let response_bytes = to_bytes(body, MAX_AUDITED_BODY_BYTES)
        .await
        .map_err(|e| AppError::Internal(format!("response body could not be buffered: {e}")))?;

    let result = decode_result(&response_bytes)?;
    let response_payload = extract_response_payload(result.as_ref())?;

    route.auditor.sink.emit(AuditEvent::Invocation(AuditRecord {
        identity,
        timestamp,
        url,
        request_payload,
        response_payload,
    }));

    Ok(Response::from_parts(parts, Body::from(response_bytes)))
}

/// Lines up the HTTP inputs with the operation's declared parameters. Path parameters
/// become JSON strings. A body is bound through the parameter's decoder, so only what the
/// handler receives is kept; a body that does not bind becomes `null` and the handler
/// rejects the request itself.
fn collect_arguments(
    signature: &OperationSignature,
    path_params: &RawPathParams,
    body: &Bytes,
) -> Vec<Value> {
    signature
        .parameters
        .iter()
        .map(|param| match param.source {
            ParamSource::Path => path_params
                .iter()
                .find(|(key, _)| *key == param.name)
                .map(|(_, value)| Value::String(value.to_string()))
                .unwrap_or(Value::Null),
            ParamSource::Body if body.is_empty() => Value::Null,
            ParamSource::Body => {
                let decoded = match param.decode {
                    Some(decode) => decode(body),
                    None => serde_json::from_slice(body),
                };
                decoded.unwrap_or_else(|e| {
                    tracing::debug!(
                        parameter = param.name,
                        error = %e,
                        "request body does not bind to the audited argument"
                    );
                    Value::Null
                })
            }
        })
        .collect()
}

/// Body-only view of a successful response. Sibling fields such as `status` and
/// `message` are not read, whatever their shape.
#[derive(Debug, Deserialize)]
struct ResultView {
    #[serde(default)]
    body: Value,
}

impl ResultBody for ResultView {
    type Body = Value;

    fn body(&self) -> &Value {
        &self.body
    }
}

/// An empty body is an absent result. Anything else must be a JSON object.
fn decode_result(bytes: &Bytes) -> AppResult<Option<ResultView>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(bytes)? {
        value @ Value::Object(_) => Ok(Some(serde_json::from_value(value)?)),
        _ => Err(AppError::Internal(
            "audited response is not a JSON object".to_string(),
        )),
    }
}
