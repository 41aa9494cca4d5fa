//! Local `storageUpdated` notifications.

use std::{cell::RefCell, rc::Rc};

use crate::local_store::Snapshot;

/// Handle returned by [`UpdateHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Rc<dyn Fn(&Snapshot)>;

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: Vec<(Subscription, Listener)>,
}

/// Fan-out of storage snapshots to interested local listeners.
#[derive(Clone, Default)]
pub struct UpdateHub {
    inner: Rc<RefCell<HubState>>,
}

impl UpdateHub {
    /// Registers a listener.
    pub fn subscribe(&self, listener: impl Fn(&Snapshot) + 'static) -> Subscription {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        let subscription = Subscription(state.next_id);
        state.listeners.push((subscription, Rc::new(listener)));
        subscription
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(id, _)| *id != subscription);
        state.listeners.len() != before
    }

    /// Calls every listener with `snapshot`, in subscription order.
    pub fn publish(&self, snapshot: &Snapshot) {
        // Listeners may subscribe or unsubscribe while being notified.
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn publish_reaches_subscribers_until_unsubscribed() {
        let hub = UpdateHub::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let subscription = {
            let seen = seen.clone();
            hub.subscribe(move |snapshot| seen.borrow_mut().push(snapshot.clone()))
        };
        let snapshot = json!({"x": 1}).as_object().cloned().expect("object");

        hub.publish(&snapshot);
        assert!(hub.unsubscribe(subscription));
        assert!(!hub.unsubscribe(subscription));
        hub.publish(&snapshot);

        assert_eq!(*seen.borrow(), vec![snapshot]);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listener_may_subscribe_during_publish() {
        let hub = UpdateHub::default();
        {
            let inner_hub = hub.clone();
            hub.subscribe(move |_| {
                inner_hub.subscribe(|_| {});
            });
        }
        hub.publish(&Snapshot::new());
        assert_eq!(hub.listener_count(), 2);
    }
}
