// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sp_core::{
    Connection, CorrelationId, Envelope, FailureKind, InMemoryBus, Message, Outcome, Reactor,
};
use yare::parameterized;

const STORE: &str = "counterValue";

struct Caller {
    conn: Connection,
    reply_to: Address,
}

impl Caller {
    fn new(bus: &InMemoryBus) -> Self {
        let conn = bus.connect();
        let reply_to = Address::reply_for(&Address::new(STORE), "caller");
        conn.transport.subscribe(&reply_to).unwrap();
        Self { conn, reply_to }
    }

    fn send(&self, properties: Properties) {
        self.conn
            .transport
            .send(Envelope::request(Request {
                address: Address::new(STORE),
                reply_to: self.reply_to.clone(),
                correlation_id: CorrelationId::new("call"),
                properties,
            }))
            .unwrap();
    }

    fn outcome(&mut self) -> Outcome {
        match self.conn.inbox.try_recv().unwrap().message {
            Message::Response(response) => response.outcome,
            other => panic!("expected response, got {:?}", other),
        }
    }
}

fn store(bus: &InMemoryBus) -> Reactor<ValueStore> {
    let mut reactor = Reactor::new(bus.connect(), ValueStore::new(STORE));
    reactor.start();
    reactor
}

#[test]
fn get_returns_zero_initially() {
    let bus = InMemoryBus::new();
    let mut reactor = store(&bus);
    let mut caller = Caller::new(&bus);

    caller.send(Properties::new().with(OPCODE, "GET"));
    reactor.run_until_idle();

    let Outcome::Ok { properties } = caller.outcome() else {
        panic!("GET failed");
    };
    assert_eq!(properties.get_i64(PROP_VALUE), Some(0));
    assert_eq!(properties.opcode(), Some("GET"));
}

#[test]
fn set_then_get_round_trips_the_value() {
    let bus = InMemoryBus::new();
    let mut reactor = store(&bus);
    let mut caller = Caller::new(&bus);

    caller.send(Properties::new().with(OPCODE, "SET").with(PROP_VALUE, 41));
    caller.send(Properties::new().with(OPCODE, "GET"));
    reactor.run_until_idle();

    let Outcome::Ok { properties } = caller.outcome() else {
        panic!("SET failed");
    };
    assert_eq!(properties.get_i64(PROP_VALUE), Some(41));
    let Outcome::Ok { properties } = caller.outcome() else {
        panic!("GET failed");
    };
    assert_eq!(properties.get_i64(PROP_VALUE), Some(41));
    assert_eq!(reactor.handler().value(), 41);
    assert_eq!(reactor.handler().served(), 2);
}

#[parameterized(
    empty = { Properties::new(), "no properties" },
    no_opcode = { Properties::new().with(PROP_VALUE, 1), "opcode" },
    unknown_opcode = { Properties::new().with(OPCODE, "DELETE"), "unknown opcode: DELETE" },
    set_without_value = { Properties::new().with(OPCODE, "SET"), "integer value" },
    set_with_text = { Properties::new().with(OPCODE, "SET").with(PROP_VALUE, "ten"), "integer value" },
)]
fn bad_requests_fail_as_protocol_errors(properties: Properties, reason: &str) {
    let bus = InMemoryBus::new();
    let mut reactor = store(&bus);
    let mut caller = Caller::new(&bus);

    caller.send(properties);
    reactor.run_until_idle();

    let Outcome::Failed { failure } = caller.outcome() else {
        panic!("request should fail");
    };
    assert_eq!(failure.kind, FailureKind::Protocol);
    assert!(failure.description.contains(reason), "{}", failure.description);
    assert_eq!(reactor.handler().value(), 0);
}
