// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end behavior of the value store and lock service on one bus

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use similar_asserts::assert_eq;
use sp_core::{
    pump, ClientId, Context, Handler, InMemoryBus, LockError, LockId, LockService,
    LockServiceConfig, Properties, Reactor, Reply, RequestFailed, Turn, OPCODE,
};
use sp_demo::{DemoConfig, ValueStore, PROP_VALUE};
use std::collections::VecDeque;

const STORE: &str = "counterValue";
const LOCKS: &str = "locks";
const LOCK: &str = "mutex.X";

#[derive(Clone, Copy, Debug)]
enum Step {
    Acquire,
    Get,
    Set(i64),
    Release,
    Destroy,
}

/// Runs steps strictly one after another, logging every outcome
struct Script {
    steps: VecDeque<Step>,
    client: Option<ClientId>,
    lock: Option<LockId>,
    log: Vec<String>,
}

impl Script {
    fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
            client: None,
            lock: None,
            log: Vec::new(),
        }
    }

    fn log(&self) -> Vec<&str> {
        self.log.iter().map(String::as_str).collect()
    }

    fn next(&mut self, ctx: &mut Context) {
        let Some(step) = self.steps.pop_front() else {
            ctx.stop();
            return;
        };
        let client = self.client.unwrap();
        let lock = self.lock.unwrap();
        let result = match step {
            Step::Acquire => ctx.acquire(lock).map_err(|e| e.to_string()),
            Step::Release => ctx.release(lock).map_err(|e| e.to_string()),
            Step::Destroy => ctx.destroy(lock).map_err(|e| e.to_string()),
            Step::Get => ctx
                .request(client, Properties::new().with(OPCODE, "GET"))
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Step::Set(value) => ctx
                .request(
                    client,
                    Properties::new().with(OPCODE, "SET").with(PROP_VALUE, value),
                )
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };
        if let Err(e) = result {
            self.log.push(format!("{:?} refused: {}", step, e));
            ctx.stop();
        }
    }
}

impl Handler for Script {
    fn on_start(&mut self, ctx: &mut Context) {
        self.client = Some(ctx.request_client(STORE).unwrap());
        self.lock = Some(ctx.lock(LOCK, LOCKS).unwrap());
        self.next(ctx);
    }

    fn on_response(&mut self, ctx: &mut Context, _client: ClientId, reply: Reply) {
        let opcode = reply.properties.opcode().unwrap_or("?").to_string();
        let value = reply.properties.get_i64(PROP_VALUE).unwrap_or(-1);
        self.log.push(format!("{} {}", opcode, value));
        self.next(ctx);
    }

    fn on_request_failed(&mut self, ctx: &mut Context, _client: ClientId, failed: RequestFailed) {
        self.log.push(format!("request failed: {}", failed.failure));
        ctx.stop();
    }

    fn on_lock_acquired(&mut self, ctx: &mut Context, _lock: LockId) {
        self.log.push("acquired".into());
        self.next(ctx);
    }

    fn on_lock_failed(&mut self, ctx: &mut Context, _lock: LockId, error: LockError) {
        self.log.push(format!("lock failed: {}", error));
        ctx.stop();
    }

    fn on_lock_released(&mut self, ctx: &mut Context, _lock: LockId) {
        self.log.push("released".into());
        self.next(ctx);
    }

    fn on_lock_destroyed(&mut self, ctx: &mut Context, _lock: LockId) {
        self.log.push("destroyed".into());
        self.next(ctx);
    }
}

struct World {
    locks: Reactor<LockService>,
    store: Reactor<ValueStore>,
    script: Reactor<Script>,
}

fn run_script(steps: &[Step]) -> World {
    let bus = InMemoryBus::new();
    let mut world = World {
        locks: Reactor::new(
            bus.connect(),
            LockService::new(LOCKS, LockServiceConfig::default()),
        ),
        store: Reactor::new(bus.connect(), ValueStore::new(STORE)),
        script: Reactor::new(bus.connect(), Script::new(steps)),
    };
    pump(&mut [
        &mut world.locks as &mut dyn Turn,
        &mut world.store,
        &mut world.script,
    ]);
    world
}

#[test]
fn value_store_get_set_get() {
    let world = run_script(&[Step::Get, Step::Set(1), Step::Get]);

    assert_eq!(world.script.handler().log(), vec!["GET 0", "SET 1", "GET 1"]);
    assert_eq!(world.store.handler().value(), 1);
    assert!(world.script.is_stopped());
}

#[test]
fn locked_increment_then_release_then_destroy() {
    let world = run_script(&[
        Step::Acquire,
        Step::Get,
        Step::Set(1),
        Step::Release,
        Step::Destroy,
    ]);

    assert_eq!(
        world.script.handler().log(),
        vec!["acquired", "GET 0", "SET 1", "released", "destroyed"]
    );
    assert!(world.locks.handler().table().get(LOCK).is_none());
}

#[test]
fn destroy_before_release_is_refused_and_lock_stays_held() {
    let world = run_script(&[Step::Acquire, Step::Destroy]);

    let log = world.script.handler().log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], "acquired");
    assert!(log[1].starts_with("Destroy refused"), "{}", log[1]);
    let record = world.locks.handler().table().get(LOCK).unwrap();
    assert!(!record.is_free());
}

#[test]
fn destroy_of_a_lock_never_acquired_is_denied() {
    let world = run_script(&[Step::Destroy]);

    let log = world.script.handler().log();
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("unknown lock"), "{}", log[0]);
}

#[test]
fn release_before_acquire_is_refused_locally() {
    let world = run_script(&[Step::Release]);

    let log = world.script.handler().log();
    assert!(log[0].starts_with("Release refused"), "{}", log[0]);
    assert_eq!(world.locks.handler().stats().locks, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_increment_clients_end_at_three() {
    let config = DemoConfig {
        clients: 3,
        ..DemoConfig::default()
    };

    let report = sp_demo::run(&config).await.unwrap();

    assert_eq!(report.final_value, 3);
    let mut written: Vec<i64> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            sp_demo::IncrementOutcome::Incremented(v) => Some(*v),
            _ => None,
        })
        .collect();
    written.sort_unstable();
    assert_eq!(written, vec![1, 2, 3]);
}
