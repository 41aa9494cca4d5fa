use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use bridge_host::{
    actions, Bridge, BridgeConfig, BridgeParts, Clock, Envelope, FixedClock, InboundOutcome,
    ManualScheduler, MemoryKeyValueStore, MemoryOrigin, NullChannel, OutboundChannel,
    RuntimeMode, Snapshot, StaticPlatform, SystemClock,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn snapshot(value: Value) -> Snapshot {
    value.as_object().cloned().expect("object literal")
}

/// One tab on a shared origin, wired the way the browser adapter wires `storage` events.
fn open_tab(origin: &MemoryOrigin) -> (Rc<Bridge>, Rc<RefCell<Vec<Snapshot>>>) {
    open_tab_with_clock(origin, Rc::new(SystemClock))
}

fn open_tab_with_clock(
    origin: &MemoryOrigin,
    clock: Rc<dyn Clock>,
) -> (Rc<Bridge>, Rc<RefCell<Vec<Snapshot>>>) {
    let area = origin.open_area();
    let bridge = Rc::new(
        Bridge::new(
            BridgeConfig::default(),
            BridgeParts {
                mode: RuntimeMode::Standalone,
                channel: Rc::new(NullChannel),
                scheduler: Rc::new(ManualScheduler::default()),
                store: Rc::new(area.clone()),
                platform: Rc::new(StaticPlatform::default()),
            },
        )
        .with_clock(clock),
    );
    {
        let bridge = bridge.clone();
        area.on_change(move |change| {
            bridge.handle_storage_change(&change.key, change.new_value.as_deref());
        });
    }
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        bridge.on_storage_updated(move |snapshot| seen.borrow_mut().push(snapshot.clone()));
    }
    (bridge, seen)
}

#[test]
fn standalone_write_reaches_sibling_tab_but_not_writer() {
    let origin = MemoryOrigin::default();
    let (tab_a, seen_a) = open_tab(&origin);
    let (_tab_b, seen_b) = open_tab(&origin);

    tab_a.set(snapshot(json!({"x": 1})), None, None);
    origin.deliver_pending();

    assert!(seen_a.borrow().is_empty());
    assert_eq!(*seen_b.borrow(), vec![snapshot(json!({"x": 1}))]);
}

#[test]
fn repeated_clear_still_notifies_siblings() {
    let origin = MemoryOrigin::default();
    let (tab_a, _) = open_tab(&origin);
    let (_tab_b, seen_b) = open_tab(&origin);

    tab_a.clear(None, None);
    origin.deliver_pending();
    tab_a.clear(None, None);
    origin.deliver_pending();

    assert_eq!(*seen_b.borrow(), vec![Snapshot::new(), Snapshot::new()]);
}

#[test]
fn same_millisecond_writes_from_two_tabs_both_reach_a_third() {
    let origin = MemoryOrigin::default();
    let clock = FixedClock::new(1_000);
    let (tab_a, _) = open_tab_with_clock(&origin, Rc::new(clock.clone()));
    let (tab_b, _) = open_tab_with_clock(&origin, Rc::new(clock.clone()));
    let (_tab_c, seen_c) = open_tab_with_clock(&origin, Rc::new(clock));

    tab_b.clear(None, None);
    tab_a.clear(None, None);
    origin.deliver_pending();

    assert_eq!(*seen_c.borrow(), vec![Snapshot::new(), Snapshot::new()]);
}

#[test]
fn sibling_tab_reads_the_shared_namespace() {
    let origin = MemoryOrigin::default();
    let (tab_a, _) = open_tab(&origin);
    let (tab_b, _) = open_tab(&origin);

    tab_a.set(snapshot(json!({"level": 4})), None, None);
    tab_b.set(snapshot(json!({"coins": 12})), None, None);
    origin.deliver_pending();

    assert_eq!(
        tab_a.get(None, Box::new(|_: Option<Value>| {}), None),
        Some(json!({"level": 4, "coins": 12}))
    );
}

#[test]
fn unrelated_keys_do_not_notify() {
    let origin = MemoryOrigin::default();
    let (tab_a, _) = open_tab(&origin);
    let (_tab_b, seen_b) = open_tab(&origin);

    tab_a.set_language("de", None);
    origin.deliver_pending();

    assert!(seen_b.borrow().is_empty());
}

/// Outbound channel handing envelopes to a simulated host frame.
#[derive(Clone, Default)]
struct HostInbox {
    queue: Rc<RefCell<VecDeque<Envelope>>>,
}

impl OutboundChannel for HostInbox {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        self.queue.borrow_mut().push_back(envelope.clone());
        Ok(())
    }
}

/// Host side of the protocol: serves storage requests from its own standalone bridge and
/// answers with `callback` envelopes.
struct SimulatedHost {
    inbox: HostInbox,
    backend: Bridge,
    replies: Rc<RefCell<Vec<Value>>>,
}

impl SimulatedHost {
    fn new(inbox: HostInbox) -> Self {
        Self {
            inbox,
            backend: Bridge::new(
                BridgeConfig::default(),
                BridgeParts {
                    mode: RuntimeMode::Standalone,
                    channel: Rc::new(NullChannel),
                    scheduler: Rc::new(ManualScheduler::default()),
                    store: Rc::new(MemoryKeyValueStore::default()),
                    platform: Rc::new(StaticPlatform::default()),
                },
            ),
            replies: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Serves every queued request. Returns the serialized replies in order.
    fn serve(&self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(envelope) = self.inbox.queue.borrow_mut().pop_front() {
            let storage_key = envelope.data["storageKey"].as_str().map(str::to_string);
            let storage_key = storage_key.as_deref();
            let args = match envelope.action.as_str() {
                actions::STORAGE_GET => {
                    let key = envelope.data["key"].as_str();
                    let value = self
                        .backend
                        .get(key, Box::new(|_: Option<Value>| {}), storage_key);
                    vec![value.unwrap_or(Value::Null)]
                }
                actions::STORAGE_SET => {
                    let changeset = envelope.data["changeset"]
                        .as_object()
                        .cloned()
                        .unwrap_or_default();
                    self.backend.set(changeset, None, storage_key);
                    Vec::new()
                }
                actions::STORAGE_REMOVE => {
                    let key = envelope.data["key"].as_str().unwrap_or_default();
                    self.backend.remove(key, None, storage_key);
                    Vec::new()
                }
                _ => continue,
            };
            let Some(callback_id) = envelope.callback_id else {
                continue;
            };
            let reply = json!({
                "action": actions::CALLBACK,
                "version": envelope.version,
                "callbackId": callback_id,
                "args": args,
            });
            self.replies.borrow_mut().push(reply.clone());
            out.push(reply.to_string());
        }
        out
    }
}

fn framed_page() -> (Bridge, SimulatedHost, ManualScheduler) {
    let inbox = HostInbox::default();
    let scheduler = ManualScheduler::default();
    let page = Bridge::new(
        BridgeConfig::default(),
        BridgeParts {
            mode: RuntimeMode::HostFrame,
            channel: Rc::new(inbox.clone()),
            scheduler: Rc::new(scheduler.clone()),
            store: Rc::new(MemoryKeyValueStore::default()),
            platform: Rc::new(StaticPlatform::default()),
        },
    );
    (page, SimulatedHost::new(inbox), scheduler)
}

#[test]
fn framed_page_round_trips_storage_through_the_host() {
    let (page, host, _) = framed_page();
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let log = log.clone();
        page.set(
            snapshot(json!({"score": 10, "name": "ada"})),
            Some(Box::new(move || log.borrow_mut().push(json!("set")))),
            None,
        );
    }
    page.remove("name", None, None);
    {
        let log = log.clone();
        page.get(
            Some("score"),
            Box::new(move |value| log.borrow_mut().push(value.unwrap_or(Value::Null))),
            None,
        );
    }

    for reply in host.serve() {
        assert!(matches!(page.receive(&reply), InboundOutcome::Resolved(_)));
    }

    assert_eq!(*log.borrow(), vec![json!("set"), json!(10)]);
    assert_eq!(page.pending_count(), 0);
    assert_eq!(host.replies.borrow().len(), 2);
}

#[test]
fn late_host_reply_after_fallback_is_ignored() {
    let (page, host, scheduler) = framed_page();
    let answers = Rc::new(RefCell::new(Vec::new()));
    {
        let answers = answers.clone();
        page.get_or(
            Some("volume"),
            json!(3),
            Box::new(move |value| answers.borrow_mut().push(value)),
            None,
        );
    }

    scheduler.advance(Duration::from_millis(500));
    let replies = host.serve();
    assert_eq!(replies.len(), 1);
    assert!(matches!(page.receive(&replies[0]), InboundOutcome::Stale(_)));

    assert_eq!(*answers.borrow(), vec![Some(json!(3))]);
}

#[test]
fn framed_page_accepts_structured_and_text_messages() {
    let (page, host, _) = framed_page();
    let answers = Rc::new(RefCell::new(Vec::new()));
    for _ in 0..2 {
        let answers = answers.clone();
        page.get(
            None,
            Box::new(move |value| answers.borrow_mut().push(value)),
            Some("profile"),
        );
    }

    let mut replies = host.serve().into_iter();
    let text = replies.next().expect("first reply");
    let structured: Value =
        serde_json::from_str(&replies.next().expect("second reply")).expect("json");

    page.receive(&text);
    page.receive_value(structured);

    assert_eq!(*answers.borrow(), vec![Some(json!({})), Some(json!({}))]);
}
