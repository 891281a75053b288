//! Payload extraction for audit records.
//!
//! Which argument of an audited operation carries the caller's payload is declared up
//! front in [`AUDITED_OPERATIONS`]; nothing is discovered per call.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::AppResult;
use crate::models::{Envelope, UserRoleChangeRequest};

/// Where an operation argument comes from in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Body,
}

/// Turns a raw request body into the value the handler actually binds.
pub type PayloadDecoder = fn(&[u8]) -> serde_json::Result<Value>;

/// decode_as
///
/// Decodes the body as `T` and re-serializes it, so fields the handler never sees are
/// dropped before anything is recorded.
pub fn decode_as<T: DeserializeOwned + Serialize>(bytes: &[u8]) -> serde_json::Result<Value> {
    serde_json::to_value(serde_json::from_slice::<T>(bytes)?)
}

/// Parameter
///
/// One declared argument of an audited operation.
#[derive(Debug, Clone, Copy)]
pub struct Parameter {
    pub name: &'static str,
    pub source: ParamSource,
    /// Marks the argument that holds the request payload.
    pub binds_payload: bool,
    /// Set for body parameters: how the handler's argument is built from the body.
    pub decode: Option<PayloadDecoder>,
}

impl Parameter {
    pub const fn path(name: &'static str) -> Self {
        Self {
            name,
            source: ParamSource::Path,
            binds_payload: false,
            decode: None,
        }
    }

    pub const fn payload(name: &'static str, decode: PayloadDecoder) -> Self {
        Self {
            name,
            source: ParamSource::Body,
            binds_payload: true,
            decode: Some(decode),
        }
    }
}

/// The operations the auditor is allowed to wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditedOperation {
    DeleteComment,
    ChangeUserRole,
}

/// OperationSignature
///
/// Declared parameter list of an audited operation, in argument order.
#[derive(Debug)]
pub struct OperationSignature {
    pub operation: AuditedOperation,
    pub parameters: &'static [Parameter],
}

impl OperationSignature {
    /// Index of the first parameter marked as binding the payload.
    pub fn payload_index(&self) -> Option<usize> {
        self.parameters.iter().position(|p| p.binds_payload)
    }
}

/// The audit allow-list.
pub static AUDITED_OPERATIONS: [OperationSignature; 2] = [
    OperationSignature {
        operation: AuditedOperation::DeleteComment,
        parameters: &[Parameter::path("comment_id")],
    },
    OperationSignature {
        operation: AuditedOperation::ChangeUserRole,
        parameters: &[
            Parameter::path("user_id"),
            Parameter::payload("request", decode_as::<UserRoleChangeRequest>),
        ],
    },
];

impl AuditedOperation {
    pub fn signature(self) -> &'static OperationSignature {
        match self {
            AuditedOperation::DeleteComment => &AUDITED_OPERATIONS[0],
            AuditedOperation::ChangeUserRole => &AUDITED_OPERATIONS[1],
        }
    }
}

/// extract_request_payload
///
/// Serializes the argument bound to the first payload-marked parameter. Returns `Ok(None)`
/// when no parameter is marked, or when no argument was supplied at that position.
/// If several parameters are marked the first one wins.
pub fn extract_request_payload<A: Serialize>(
    signature: &OperationSignature,
    arguments: &[A],
) -> AppResult<Option<String>> {
    let Some(argument) = signature.payload_index().and_then(|i| arguments.get(i)) else {
        return Ok(None);
    };
    Ok(Some(serde_json::to_string(argument)?))
}

/// A result shape that carries a domain payload under `body`.
pub trait ResultBody {
    type Body: Serialize;

    fn body(&self) -> &Self::Body;
}

impl<T: Serialize> ResultBody for Envelope<T> {
    type Body = T;

    fn body(&self) -> &T {
        &self.body
    }
}

/// extract_response_payload
///
/// Serializes the `body` of a result. An absent result yields `Ok(None)`; no other
/// field of the result ever appears in the output.
pub fn extract_response_payload<R: ResultBody>(result: Option<&R>) -> AppResult<Option<String>> {
    match result {
        None => Ok(None),
        Some(result) => Ok(Some(serde_json::to_string(result.body())?)),
    }
}
