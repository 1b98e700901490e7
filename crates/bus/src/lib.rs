//! Device-scoped live event fan-out.
//!
//! Maps device identifiers to the set of currently subscribed viewer
//! sessions and delivers published events to each of them, best-effort.
//! No durability, no replay: sessions that join after a publish never see
//! it, delivery is at-most-once.
//!
//! All bookkeeping lives behind a single mutex owned by [`EventBus`];
//! publish collects subscriber channels under the lock and sends without
//! awaiting, so a slow or dead subscriber can neither block nor fail a
//! publish to the others.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use muster_core::{DeviceId, LiveEvent, SessionId};

/// Sender half handed to the bus when a viewer session connects.
pub type EventSender = mpsc::UnboundedSender<LiveEvent>;

#[derive(Debug, Default)]
struct BusInner {
    /// Subscriber sets, keyed by device.
    by_device: HashMap<DeviceId, HashSet<SessionId>>,
    /// Every connected session, with its current device focus (if any)
    /// and its outbound channel.
    sessions: HashMap<SessionId, SessionEntry>,
}

#[derive(Debug)]
struct SessionEntry {
    device: Option<DeviceId>,
    tx: EventSender,
}

impl BusInner {
    /// Detach `session` from its current device set, if any.
    fn leave_current(&mut self, session: SessionId) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };
        if let Some(device) = entry.device.take()
            && let Some(set) = self.by_device.get_mut(&device)
        {
            set.remove(&session);
            if set.is_empty() {
                self.by_device.remove(&device);
            }
        }
    }
}

/// In-process publish/subscribe keyed by device identifier.
///
/// Each connected session holds at most one device subscription at a time;
/// subscribing to a second device implicitly leaves the first (last-join
/// wins), so a viewer can switch focus without reconnecting.
#[derive(Debug, Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live session and its outbound channel.
    /// The session starts with no device focus.
    pub fn connect(&self, tx: EventSender) -> SessionId {
        let session = SessionId::generate();
        let mut inner = self.lock();
        inner.sessions.insert(session, SessionEntry { device: None, tx });
        debug!(session = %session, "session connected");
        session
    }

    /// Focus `session` on `device`, leaving any previous focus first.
    /// Unknown (already closed) sessions are ignored.
    pub fn subscribe(&self, session: SessionId, device: &DeviceId) {
        let mut inner = self.lock();
        if !inner.sessions.contains_key(&session) {
            return;
        }
        inner.leave_current(session);
        inner
            .by_device
            .entry(device.clone())
            .or_default()
            .insert(session);
        if let Some(entry) = inner.sessions.get_mut(&session) {
            entry.device = Some(device.clone());
        }
        debug!(session = %session, device = %device, "session subscribed");
    }

    /// Remove `session` from `device`'s subscriber set. No-op if the
    /// session is not subscribed to that device.
    pub fn unsubscribe(&self, session: SessionId, device: &DeviceId) {
        let mut inner = self.lock();
        let focused_here = inner
            .sessions
            .get(&session)
            .is_some_and(|entry| entry.device.as_ref() == Some(device));
        if focused_here {
            inner.leave_current(session);
            debug!(session = %session, device = %device, "session unsubscribed");
        }
    }

    /// Drop all bus state for `session`. Safe to call more than once.
    pub fn on_session_closed(&self, session: SessionId) {
        let mut inner = self.lock();
        inner.leave_current(session);
        if inner.sessions.remove(&session).is_some() {
            debug!(session = %session, "session closed");
        }
    }

    /// Deliver `event` to every session currently subscribed to `device`,
    /// fire-and-forget. Returns the number of sessions reached. Zero
    /// subscribers is a no-op; a dead subscriber channel is pruned and
    /// never surfaces to the publisher.
    pub fn publish(&self, device: &DeviceId, event: &LiveEvent) -> usize {
        let mut inner = self.lock();
        let Some(subscribers) = inner.by_device.get(device) else {
            return 0;
        };
        let subscribers: Vec<SessionId> = subscribers.iter().copied().collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for session in subscribers {
            let Some(entry) = inner.sessions.get(&session) else {
                continue;
            };
            if entry.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!(session = %session, device = %device, "dropping dead subscriber");
                dead.push(session);
            }
        }
        for session in dead {
            inner.leave_current(session);
            inner.sessions.remove(&session);
        }
        delivered
    }

    /// Number of sessions currently subscribed to `device`.
    #[must_use]
    pub fn subscriber_count(&self, device: &DeviceId) -> usize {
        self.lock().by_device.get(device).map_or(0, HashSet::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // A poisoned bus mutex means a panic while holding it; the
        // bookkeeping is still structurally valid, so keep serving.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use muster_core::LocationEvent;

    fn location(device: &str, lat: f64) -> LiveEvent {
        LiveEvent::Location(LocationEvent {
            device_id: DeviceId::from(device),
            lat,
            lon: 2.0,
            accuracy: Some(5.0),
            timestamp: Utc::now(),
        })
    }

    fn connect(bus: &EventBus) -> (SessionId, mpsc::UnboundedReceiver<LiveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (bus.connect(tx), rx)
    }

    #[test]
    fn publish_reaches_subscribed_session() {
        let bus = EventBus::new();
        let (session, mut rx) = connect(&bus);
        let dev = DeviceId::from("dev1");

        bus.subscribe(session, &dev);
        let ev = location("dev1", 1.0);
        assert_eq!(bus.publish(&dev, &ev), 1);
        assert_eq!(rx.try_recv().unwrap(), ev);
    }

    #[test]
    fn publish_with_no_subscribers_is_a_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&DeviceId::from("ghost"), &location("ghost", 0.0)), 0);
    }

    #[test]
    fn last_join_wins() {
        let bus = EventBus::new();
        let (session, mut rx) = connect(&bus);
        let dev_a = DeviceId::from("A");
        let dev_b = DeviceId::from("B");

        bus.subscribe(session, &dev_a);
        bus.subscribe(session, &dev_b);

        assert_eq!(bus.publish(&dev_a, &location("A", 1.0)), 0);
        assert_eq!(bus.publish(&dev_b, &location("B", 2.0)), 1);

        let got = rx.try_recv().unwrap();
        assert_eq!(got.device_id(), &dev_b);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_are_scoped_to_the_joined_device() {
        let bus = EventBus::new();
        let (s1, mut rx1) = connect(&bus);
        let (s2, mut rx2) = connect(&bus);
        bus.subscribe(s1, &DeviceId::from("dev1"));
        bus.subscribe(s2, &DeviceId::from("dev2"));

        let ev = location("dev1", 1.0);
        assert_eq!(bus.publish(&DeviceId::from("dev1"), &ev), 1);

        assert_eq!(rx1.try_recv().unwrap(), ev);
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_is_a_noop_when_absent() {
        let bus = EventBus::new();
        let (session, _rx) = connect(&bus);
        let dev = DeviceId::from("dev1");

        // Never subscribed: nothing happens.
        bus.unsubscribe(session, &dev);

        // Subscribed to another device: focus is preserved.
        bus.subscribe(session, &dev);
        bus.unsubscribe(session, &DeviceId::from("unrelated"));
        assert_eq!(bus.subscriber_count(&dev), 1);
    }

    #[test]
    fn closed_session_is_unreachable_and_close_is_idempotent() {
        let bus = EventBus::new();
        let (session, mut rx) = connect(&bus);
        let dev = DeviceId::from("dev1");
        bus.subscribe(session, &dev);

        bus.on_session_closed(session);
        bus.on_session_closed(session);

        assert_eq!(bus.publish(&dev, &location("dev1", 1.0)), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.subscriber_count(&dev), 0);
    }

    #[test]
    fn dead_subscriber_is_isolated_and_pruned() {
        let bus = EventBus::new();
        let dev = DeviceId::from("dev1");

        let (alive, mut rx_alive) = connect(&bus);
        let (dead, rx_dead) = connect(&bus);
        bus.subscribe(alive, &dev);
        bus.subscribe(dead, &dev);
        drop(rx_dead);

        // The dead channel neither blocks nor fails delivery to the rest.
        assert_eq!(bus.publish(&dev, &location("dev1", 1.0)), 1);
        assert!(rx_alive.try_recv().is_ok());

        // And it was pruned along the way.
        assert_eq!(bus.subscriber_count(&dev), 1);
    }

    #[test]
    fn same_producer_order_is_preserved_per_device() {
        let bus = EventBus::new();
        let (session, mut rx) = connect(&bus);
        let dev = DeviceId::from("dev1");
        bus.subscribe(session, &dev);

        for lat in 0..10 {
            bus.publish(&dev, &location("dev1", f64::from(lat)));
        }
        for lat in 0..10 {
            let LiveEvent::Location(got) = rx.try_recv().unwrap();
            assert!((got.lat - f64::from(lat)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn subscribe_after_close_is_ignored() {
        let bus = EventBus::new();
        let (session, _rx) = connect(&bus);
        let dev = DeviceId::from("dev1");

        bus.on_session_closed(session);
        bus.subscribe(session, &dev);
        assert_eq!(bus.subscriber_count(&dev), 0);
    }
}
