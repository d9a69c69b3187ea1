// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::{BusError, Connection, InMemoryBus};
use crate::message::{CorrelationId, FailureKind, Message, Outcome, OPCODE};

fn request(reply_to: &str) -> Request {
    Request {
        address: Address::new("svc"),
        reply_to: Address::new(reply_to),
        correlation_id: CorrelationId::new("corr-7"),
        properties: Properties::new().with(OPCODE, "GET"),
    }
}

fn setup() -> (RequestServer, Connection) {
    let bus = InMemoryBus::new();
    let server_conn = bus.connect();
    let server = RequestServer::new(server_conn.transport, Address::new("svc")).unwrap();
    let client = bus.connect();
    client.transport.subscribe(&Address::new("reply")).unwrap();
    (server, client)
}

fn next_response(client: &mut Connection) -> Response {
    match client.inbox.try_recv().unwrap().message {
        Message::Response(response) => response,
        other => panic!("expected response, got {:?}", other),
    }
}

#[test]
fn reply_echoes_correlation_id_to_reply_address() {
    let (server, mut client) = setup();

    server
        .reply(request("reply"), Properties::new().with("value", 0))
        .unwrap();

    let response = next_response(&mut client);
    assert_eq!(response.correlation_id, CorrelationId::new("corr-7"));
    assert_eq!(
        response.outcome,
        Outcome::Ok {
            properties: Properties::new().with("value", 0)
        }
    );
}

#[test]
fn fail_sends_failed_outcome_with_kind() {
    let (server, mut client) = setup();

    server
        .fail(request("reply"), Failure::protocol("Unknown opcode: FROB"))
        .unwrap();

    let response = next_response(&mut client);
    let Outcome::Failed { failure } = response.outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Protocol);
    assert_eq!(failure.description, "Unknown opcode: FROB");
}

#[test]
fn reply_to_vanished_client_is_reported() {
    let (server, _client) = setup();
    let err = server
        .reply(request("gone"), Properties::new())
        .unwrap_err();
    assert!(matches!(err, RpcError::Bus(BusError::Unroutable(_))));
}

#[test]
fn notify_reaches_address_without_a_request() {
    let (server, mut client) = setup();

    server
        .notify(&Address::new("reply"), Properties::new().with(OPCODE, "GRANTED"))
        .unwrap();

    let Message::Notification(note) = client.inbox.try_recv().unwrap().message else {
        panic!("expected notification");
    };
    assert_eq!(note.from, Address::new("svc"));
    assert_eq!(note.properties.opcode(), Some("GRANTED"));
}

#[test]
fn stopped_server_refuses_to_answer() {
    let (mut server, _client) = setup();
    server.stop();
    assert!(matches!(
        server.reply(request("reply"), Properties::new()),
        Err(RpcError::Stopped)
    ));
}
