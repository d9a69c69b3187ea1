// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire entities exchanged over the bus
//!
//! Requests and responses are correlated by a [`CorrelationId`]; notifications
//! are unsolicited and routed purely by address. The property map is opaque
//! to this crate apart from the `opcode` convention used by application
//! protocols.

use crate::bus::BusError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property key carrying the application-level operation name
pub const OPCODE: &str = "opcode";

/// Opaque bus address (`host:port`, queue name, service name, ...)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Private reply address for one client of `service`
    pub fn reply_for(service: &Address, id: &str) -> Self {
        Self(format!("{}/reply/{}", service.0, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token linking a request to its response
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar property value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Ordered string-keyed payload of a request, response or notification
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// The `opcode` property, if present and a string
    pub fn opcode(&self) -> Option<&str> {
        self.get_str(OPCODE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Category of a failed request, so callers can tell malformed input from
/// a refused operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed request: missing properties, unknown opcode
    Protocol,
    /// Operation not valid for the current state of the target
    StateViolation,
    /// Any other application-level refusal
    Application,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Protocol => "protocol error",
            FailureKind::StateViolation => "state violation",
            FailureKind::Application => "application error",
        };
        write!(f, "{}", name)
    }
}

/// Failure carried by a `FAILED` response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub description: String,
}

impl Failure {
    pub fn new(kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn protocol(description: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, description)
    }

    pub fn state_violation(description: impl Into<String>) -> Self {
        Self::new(FailureKind::StateViolation, description)
    }

    pub fn application(description: impl Into<String>) -> Self {
        Self::new(FailureKind::Application, description)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)
    }
}

impl From<String> for Failure {
    fn from(description: String) -> Self {
        Self::application(description)
    }
}

impl From<&str> for Failure {
    fn from(description: &str) -> Self {
        Self::application(description)
    }
}

/// A correlated request addressed to a service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub address: Address,
    pub reply_to: Address,
    pub correlation_id: CorrelationId,
    pub properties: Properties,
}

/// Result carried by a response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Ok { properties: Properties },
    Failed { failure: Failure },
}

/// Response to a request, echoing its correlation id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub correlation_id: CorrelationId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn ok(correlation_id: CorrelationId, properties: Properties) -> Self {
        Self {
            correlation_id,
            outcome: Outcome::Ok { properties },
        }
    }

    pub fn failed(correlation_id: CorrelationId, failure: Failure) -> Self {
        Self {
            correlation_id,
            outcome: Outcome::Failed { failure },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok { .. })
    }
}

/// Unsolicited message pushed to an address without a prior request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub from: Address,
    pub properties: Properties,
}

/// Transport signal that `service` now has a subscriber
///
/// Delivered to an address that asked to watch `service`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    pub service: Address,
}

/// Everything that travels over the bus
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
    Ready(Ready),
}

impl Message {
    /// Short name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request(_) => "request",
            Message::Response(_) => "response",
            Message::Notification(_) => "notification",
            Message::Ready(_) => "ready",
        }
    }
}

/// A message plus the address it is routed to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub to: Address,
    pub message: Message,
}

impl Envelope {
    pub fn request(request: Request) -> Self {
        Self {
            to: request.address.clone(),
            message: Message::Request(request),
        }
    }

    pub fn response(to: Address, response: Response) -> Self {
        Self {
            to,
            message: Message::Response(response),
        }
    }

    pub fn notification(to: Address, notification: Notification) -> Self {
        Self {
            to,
            message: Message::Notification(notification),
        }
    }

    pub fn ready(to: Address, service: Address) -> Self {
        Self {
            to,
            message: Message::Ready(Ready { service }),
        }
    }

    /// JSON encoding for transports that carry bytes
    pub fn encode(&self) -> Result<Vec<u8>, BusError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BusError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
