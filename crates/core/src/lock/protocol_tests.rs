// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::FailureKind;
use yare::parameterized;

#[test]
fn request_properties_parse_back() {
    let request = LockRequest::new(LockOp::Release, "mutex.counterValue", HolderId::new("h-1"));
    let parsed = LockRequest::from_properties(&request.to_properties()).unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn success_reply_reports_status_for_op() {
    let request = LockRequest::new(LockOp::Destroy, "m", HolderId::new("h-1"));
    let props = request.success_properties();
    assert_eq!(props.opcode(), Some("DESTROY"));
    assert_eq!(props.get_str(PROP_STATUS), Some("DESTROYED"));
    assert_eq!(props.get_str(PROP_LOCK), Some("m"));
}

#[parameterized(
    empty = { Properties::new(), ProtocolError::Empty },
    no_opcode = {
        Properties::new().with(PROP_LOCK, "m"),
        ProtocolError::MissingProperty(OPCODE)
    },
    unknown_opcode = {
        Properties::new().with(OPCODE, "STEAL").with(PROP_LOCK, "m"),
        ProtocolError::UnknownOpcode("STEAL".into())
    },
    no_lock = {
        Properties::new().with(OPCODE, "ACQUIRE").with(PROP_REQUESTER, "h"),
        ProtocolError::MissingProperty(PROP_LOCK)
    },
    numeric_requester = {
        Properties::new().with(OPCODE, "ACQUIRE").with(PROP_LOCK, "m").with(PROP_REQUESTER, 4),
        ProtocolError::InvalidProperty(PROP_REQUESTER)
    },
    empty_lock_name = {
        Properties::new().with(OPCODE, "RELEASE").with(PROP_LOCK, "").with(PROP_REQUESTER, "h"),
        ProtocolError::InvalidProperty(PROP_LOCK)
    },
)]
fn malformed_requests_are_rejected(props: Properties, expected: ProtocolError) {
    assert_eq!(LockRequest::from_properties(&props), Err(expected));
}

#[test]
fn protocol_errors_become_protocol_failures() {
    let failure: Failure = ProtocolError::UnknownOpcode("STEAL".into()).into();
    assert_eq!(failure.kind, FailureKind::Protocol);
    assert_eq!(failure.description, "unknown opcode: STEAL");
}

#[test]
fn grant_notification_parses_back() {
    let grant = Grant {
        lock: "m".into(),
        holder: HolderId::new("h-2"),
    };
    assert_eq!(Grant::from_properties(&grant.to_properties()), Ok(grant));
}

#[test]
fn grant_rejects_other_opcodes() {
    let props = Properties::new()
        .with(OPCODE, "ACQUIRE")
        .with(PROP_LOCK, "m")
        .with(PROP_REQUESTER, "h");
    assert!(Grant::from_properties(&props).is_err());
}
