// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock protocol vocabulary
//!
//! Requests: `opcode` (`ACQUIRE` | `RELEASE` | `DESTROY`), `lock`, `requester`.
//! Replies echo `opcode` and `lock` and add `status`. A waiter promoted to
//! holder is told with a `GRANTED` notification.

use crate::message::{Failure, Properties, OPCODE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const PROP_LOCK: &str = "lock";
pub const PROP_REQUESTER: &str = "requester";
pub const PROP_STATUS: &str = "status";

pub const STATUS_GRANTED: &str = "GRANTED";
pub const STATUS_RELEASED: &str = "RELEASED";
pub const STATUS_DESTROYED: &str = "DESTROYED";

/// Opcode of the promotion notification
pub const OPCODE_GRANTED: &str = "GRANTED";

/// Identity of a lock requester
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockOp {
    Acquire,
    Release,
    Destroy,
}

impl LockOp {
    pub fn opcode(self) -> &'static str {
        match self {
            LockOp::Acquire => "ACQUIRE",
            LockOp::Release => "RELEASE",
            LockOp::Destroy => "DESTROY",
        }
    }

    pub fn from_opcode(opcode: &str) -> Option<Self> {
        match opcode {
            "ACQUIRE" => Some(LockOp::Acquire),
            "RELEASE" => Some(LockOp::Release),
            "DESTROY" => Some(LockOp::Destroy),
            _ => None,
        }
    }

    /// Status reported in a successful reply
    pub fn success_status(self) -> &'static str {
        match self {
            LockOp::Acquire => STATUS_GRANTED,
            LockOp::Release => STATUS_RELEASED,
            LockOp::Destroy => STATUS_DESTROYED,
        }
    }
}

impl fmt::Display for LockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LockOp::Acquire => "acquire",
            LockOp::Release => "release",
            LockOp::Destroy => "destroy",
        };
        write!(f, "{}", verb)
    }
}

/// Malformed lock request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("request has no properties")]
    Empty,

    #[error("missing property: {0}")]
    MissingProperty(&'static str),

    #[error("property {0} must be a non-empty string")]
    InvalidProperty(&'static str),

    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),
}

impl From<ProtocolError> for Failure {
    fn from(err: ProtocolError) -> Self {
        Failure::protocol(err.to_string())
    }
}

/// One acquire, release or destroy request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRequest {
    pub op: LockOp,
    pub lock: String,
    pub requester: HolderId,
}

impl LockRequest {
    pub fn new(op: LockOp, lock: impl Into<String>, requester: HolderId) -> Self {
        Self {
            op,
            lock: lock.into(),
            requester,
        }
    }

    pub fn to_properties(&self) -> Properties {
        Properties::new()
            .with(OPCODE, self.op.opcode())
            .with(PROP_LOCK, self.lock.as_str())
            .with(PROP_REQUESTER, self.requester.as_str())
    }

    pub fn from_properties(props: &Properties) -> Result<Self, ProtocolError> {
        if props.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let opcode = required_str(props, OPCODE)?;
        let op = LockOp::from_opcode(opcode)
            .ok_or_else(|| ProtocolError::UnknownOpcode(opcode.to_string()))?;
        let lock = required_str(props, PROP_LOCK)?;
        let requester = required_str(props, PROP_REQUESTER)?;
        Ok(Self::new(op, lock, HolderId::new(requester)))
    }

    /// Properties of the reply sent when this request succeeds
    pub fn success_properties(&self) -> Properties {
        Properties::new()
            .with(OPCODE, self.op.opcode())
            .with(PROP_LOCK, self.lock.as_str())
            .with(PROP_STATUS, self.op.success_status())
    }
}

/// Promotion of a waiter to holder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub lock: String,
    pub holder: HolderId,
}

impl Grant {
    pub fn to_properties(&self) -> Properties {
        Properties::new()
            .with(OPCODE, OPCODE_GRANTED)
            .with(PROP_LOCK, self.lock.as_str())
            .with(PROP_REQUESTER, self.holder.as_str())
    }

    pub fn from_properties(props: &Properties) -> Result<Self, ProtocolError> {
        let opcode = required_str(props, OPCODE)?;
        if opcode != OPCODE_GRANTED {
            return Err(ProtocolError::UnknownOpcode(opcode.to_string()));
        }
        Ok(Self {
            lock: required_str(props, PROP_LOCK)?.to_string(),
            holder: HolderId::new(required_str(props, PROP_REQUESTER)?),
        })
    }
}

fn required_str<'a>(props: &'a Properties, key: &'static str) -> Result<&'a str, ProtocolError> {
    let value = props.get(key).ok_or(ProtocolError::MissingProperty(key))?;
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ProtocolError::InvalidProperty(key)),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
