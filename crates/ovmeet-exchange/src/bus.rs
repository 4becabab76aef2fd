// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Local event bus over the exchange task.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use snafu::Snafu;

use crate::{ExchangeHandle, SubscriberHandle, SystemEvent, Topic};

type Handler = Arc<dyn Fn(&SystemEvent) + Send + Sync>;

struct HandlerEntry {
    id: u64,
    once: bool,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    handlers: HashMap<Topic, Vec<HandlerEntry>>,
}

/// Identifies a registered handler for [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId {
    topic: Topic,
    id: u64,
}

#[derive(Debug, Snafu)]
pub enum WaitError {
    /// The awaited event was not observed within the given window.
    #[snafu(display("Timed out waiting for {topic} event"))]
    Timeout { topic: Topic },

    /// The exchange went away while waiting.
    #[snafu(display("Subscription closed while waiting for {topic} event"))]
    SubscriptionClosed { topic: Topic },
}

/// Two-tier event bus.
///
/// [`emit`](Self::emit) dispatches to the handlers registered in this
/// replica only; a handler observes each local emit once per registration.
/// [`broadcast`](Self::broadcast) additionally publishes through the
/// exchange so every replica (including this one) dispatches the event,
/// at-most-once per remote replica.
///
/// Handlers must be non-blocking; long-running work belongs on the
/// scheduler.
#[derive(Clone)]
pub struct EventBus {
    exchange: ExchangeHandle,
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Create the bus and spawn its pump task which feeds broadcast events
    /// from the exchange into the local handler registry.
    pub fn new(exchange: ExchangeHandle) -> Self {
        let bus = Self {
            exchange: exchange.clone(),
            registry: Arc::new(Mutex::new(Registry::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        };

        let mut subscriber = exchange.create_subscriber(&Topic::ALL);
        let registry = bus.registry.clone();

        tokio::spawn(async move {
            while let Some(payload) = subscriber.receive().await {
                match serde_json::from_str::<SystemEvent>(&payload) {
                    Ok(event) => dispatch(&registry, &event),
                    Err(e) => log::warn!("Dropping malformed event from exchange: {e}"),
                }
            }
        });

        bus
    }

    /// Register a handler for `topic`. Handlers fire in registration order.
    pub fn on(
        &self,
        topic: Topic,
        handler: impl Fn(&SystemEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        self.register(topic, handler, false)
    }

    /// Register a handler that is removed after its first invocation.
    pub fn once(
        &self,
        topic: Topic,
        handler: impl Fn(&SystemEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        self.register(topic, handler, true)
    }

    fn register(
        &self,
        topic: Topic,
        handler: impl Fn(&SystemEvent) + Send + Sync + 'static,
        once: bool,
    ) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.registry
            .lock()
            .handlers
            .entry(topic)
            .or_default()
            .push(HandlerEntry {
                id,
                once,
                handler: Arc::new(handler),
            });

        HandlerId { topic, id }
    }

    /// Remove a registered handler. Idempotent.
    pub fn off(&self, handle: HandlerId) {
        let mut registry = self.registry.lock();

        if let Some(entries) = registry.handlers.get_mut(&handle.topic) {
            entries.retain(|entry| entry.id != handle.id);
        }
    }

    /// Dispatch an event to the handlers of this replica only.
    pub fn emit(&self, event: &SystemEvent) {
        dispatch(&self.registry, event);
    }

    /// Publish an event to every replica.
    ///
    /// The local dispatch happens through the exchange as well, so handlers
    /// observe the event exactly once.
    pub fn broadcast(&self, event: &SystemEvent) {
        let data =
            serde_json::to_string(event).expect("event serialization cannot fail");

        if let Err(e) = self.exchange.publish(event.topic(), data) {
            log::error!("Failed to broadcast {} event: {e}", event.topic());
        }
    }

    /// Subscribe to raw broadcast events of the given topics.
    pub fn subscribe(&self, topics: &[Topic]) -> SubscriberHandle {
        self.exchange.create_subscriber(topics)
    }

    /// Wait for the first broadcast event under `topic` matching
    /// `predicate`.
    pub async fn wait_for(
        &self,
        topic: Topic,
        predicate: impl Fn(&SystemEvent) -> bool,
        window: Duration,
    ) -> Result<SystemEvent, WaitError> {
        let mut subscriber = self.exchange.create_subscriber(&[topic]);

        Self::wait_on_subscription(&mut subscriber, topic, predicate, window).await
    }

    /// Wait on an existing subscription for the first event matching
    /// `predicate`.
    ///
    /// Callers that must not miss an event subscribe first, perform the
    /// action that triggers the event, and then wait here.
    pub async fn wait_on_subscription(
        subscriber: &mut SubscriberHandle,
        topic: Topic,
        predicate: impl Fn(&SystemEvent) -> bool,
        window: Duration,
    ) -> Result<SystemEvent, WaitError> {
        let wait = async {
            loop {
                let Some(payload) = subscriber.receive().await else {
                    return Err(WaitError::SubscriptionClosed { topic });
                };

                match serde_json::from_str::<SystemEvent>(&payload) {
                    Ok(event) if predicate(&event) => return Ok(event),
                    Ok(_) => continue,
                    Err(e) => {
                        log::warn!("Dropping malformed event from exchange: {e}");
                        continue;
                    }
                }
            }
        };

        tokio::time::timeout(window, wait)
            .await
            .map_err(|_| WaitError::Timeout { topic })?
    }
}

fn dispatch(registry: &Arc<Mutex<Registry>>, event: &SystemEvent) {
    let topic = event.topic();

    // Collect the handlers under the lock, invoke them outside of it so a
    // handler may register/remove handlers itself.
    let handlers: Vec<Handler> = {
        let mut registry = registry.lock();

        let Some(entries) = registry.handlers.get_mut(&topic) else {
            return;
        };

        let handlers = entries
            .iter()
            .map(|entry| entry.handler.clone())
            .collect();

        entries.retain(|entry| !entry.once);

        handlers
    };

    for handler in handlers {
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ExchangeTask;
    use ovmeet_types::rooms::RoomId;

    fn meeting_started(room: &str) -> SystemEvent {
        SystemEvent::MeetingStarted {
            room_id: RoomId::parse(room).unwrap(),
        }
    }

    fn bus() -> EventBus {
        EventBus::new(ExchangeTask::spawn())
    }

    #[tokio::test]
    async fn handlers_fire_in_registration_order() {
        let bus = bus();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            let _ = bus.on(Topic::MeetingStarted, move |_| order.lock().push(tag));
        }

        bus.emit(&meeting_started("demo-1"));

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn once_handlers_fire_a_single_time() {
        let bus = bus();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = calls.clone();
        let _ = bus.once(Topic::MeetingEnded, move |_| {
            let _ = counted.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&meeting_started("demo-1"));
        bus.emit(&SystemEvent::MeetingEnded {
            room_id: RoomId::parse("demo-1").unwrap(),
        });
        bus.emit(&SystemEvent::MeetingEnded {
            room_id: RoomId::parse("demo-1").unwrap(),
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn off_removes_a_handler() {
        let bus = bus();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = calls.clone();
        let handle = bus.on(Topic::MeetingStarted, move |_| {
            let _ = counted.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&meeting_started("demo-1"));
        bus.off(handle);
        bus.off(handle);
        bus.emit(&meeting_started("demo-1"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_for_matches_on_predicate() {
        let bus = bus();

        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.wait_for(
                    Topic::MeetingStarted,
                    |event| {
                        matches!(
                            event,
                            SystemEvent::MeetingStarted { room_id } if room_id.as_str() == "demo-2"
                        )
                    },
                    Duration::from_secs(5),
                )
                .await
            })
        };

        // Give the waiter time to subscribe before publishing.
        tokio::time::sleep(Duration::from_millis(50)).await;

        bus.broadcast(&meeting_started("demo-1"));
        bus.broadcast(&meeting_started("demo-2"));

        let event = waiter.await.unwrap().unwrap();
        assert_eq!(event, meeting_started("demo-2"));
    }

    #[tokio::test]
    async fn wait_for_times_out() {
        let bus = bus();

        let result = bus
            .wait_for(Topic::RecordingActive, |_| true, Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(WaitError::Timeout { .. })));
    }

    #[tokio::test]
    async fn broadcast_reaches_local_handlers_once() {
        let bus = bus();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = calls.clone();
        let _ = bus.on(Topic::MeetingStarted, move |_| {
            let _ = counted.fetch_add(1, Ordering::SeqCst);
        });

        bus.broadcast(&meeting_started("demo-1"));

        // Delivery runs through the pump task.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
