//! Pub/Sub event bus for engine diagnostics.
//!
//! Architecture:
//! - Hosts subscribe to event types with callbacks (immediate invocation)
//! - emit() invokes callbacks immediately AND queues for deferred processing
//! - poll() returns queued events for batch processing by the host
//!
//! Callbacks run on the emitting thread, which is the clock thread for
//! per-tick diagnostics, while the engine lock is held. Keep them short and
//! never call back into the engine from a callback.
//!
//! Callback order: FIFO (first-subscribed, first-called) within same event type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use log::debug;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

type Subscribers = Arc<RwLock<HashMap<TypeId, Vec<Callback>>>>;
type Queue = Arc<Mutex<Vec<BoxedEvent>>>;

fn dispatch<E: Event + Clone>(subscribers: &Subscribers, queue: &Queue, event: E) {
    let type_id = TypeId::of::<E>();

    if let Some(cbs) = subscribers.read().unwrap_or_else(|e| e.into_inner()).get(&type_id) {
        for cb in cbs {
            cb(&event);
        }
    }

    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    if queue.len() >= MAX_QUEUE_SIZE {
        let evict_count = queue.len() / 2;
        debug!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
        queue.drain(0..evict_count);
    }
    queue.push(Box::new(event));
}

/// Pub/Sub event bus with deferred processing support.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Subscribers,
    queue: Queue,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_types", &self.subscribers.read().map(|s| s.len()).unwrap_or(0))
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to events of type E.
    ///
    /// # Example
    /// ```ignore
    /// bus.subscribe::<ManifestResolutionFailureEvent, _>(|e| {
    ///     log::error!("unresolved {}", e.key);
    /// });
    /// ```
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<E>();
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(type_id)
            .or_default()
            .push(wrapped);
    }

    /// Emit event: invoke callbacks immediately AND queue for poll().
    pub fn emit<E: Event + Clone>(&self, event: E) {
        dispatch(&self.subscribers, &self.queue, event);
    }

    /// Take all queued events.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Get an emitter handle for engine components.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            inner: Some((Arc::clone(&self.subscribers), Arc::clone(&self.queue))),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Emitter handle held by engine components.
///
/// `EventEmitter::dummy()` drops every event, for components used without a bus.
#[derive(Clone, Default)]
pub struct EventEmitter {
    inner: Option<(Subscribers, Queue)>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("connected", &self.inner.is_some())
            .finish()
    }
}

impl EventEmitter {
    pub fn dummy() -> Self {
        Self { inner: None }
    }

    /// Emit event (no-op if dummy)
    pub fn emit<E: Event + Clone>(&self, event: E) {
        if let Some((subscribers, queue)) = &self.inner {
            dispatch(subscribers, queue, event);
        }
    }
}

/// Downcast a BoxedEvent to a concrete type
///
/// Must deref to `dyn Event` before calling `as_any()`; otherwise the blanket
/// impl for `Box<dyn Event>` answers and the downcast always fails.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone, Debug)]
    struct TestEvent { value: i32 }

    #[derive(Clone, Debug)]
    struct OtherEvent;

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        bus.subscribe::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });

        bus.emit(TestEvent { value: 10 });
        bus.emit(OtherEvent);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(TestEvent { value: 1 });
        bus.emit(OtherEvent);

        assert_eq!(bus.queue_len(), 2);
        assert_eq!(bus.poll().len(), 2);
        assert_eq!(bus.poll().len(), 0);
    }

    #[test]
    fn test_emitter_handle() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        bus.subscribe::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });

        bus.emitter().emit(TestEvent { value: 42 });
        assert_eq!(counter.load(Ordering::SeqCst), 42);
        assert_eq!(bus.poll().len(), 1);
    }

    #[test]
    fn test_dummy_emitter_drops_events() {
        let emitter = EventEmitter::dummy();
        emitter.emit(TestEvent { value: 1 });
    }

    #[test]
    fn test_queue_eviction() {
        let bus = EventBus::new();
        for i in 0..(MAX_QUEUE_SIZE as i32 + 1) {
            bus.emit(TestEvent { value: i });
        }
        assert_eq!(bus.queue_len(), MAX_QUEUE_SIZE / 2 + 1);
    }

    #[test]
    fn test_downcast() {
        let bus = EventBus::new();
        bus.emit(TestEvent { value: 42 });

        let events = bus.poll();
        assert_eq!(downcast_event::<TestEvent>(&events[0]).map(|e| e.value), Some(42));
        assert!(downcast_event::<OtherEvent>(&events[0]).is_none());
    }

    #[test]
    fn test_clone_shares_queue() {
        let bus = EventBus::new();
        let reader = bus.clone();
        bus.emit(TestEvent { value: 3 });
        bus.emitter().emit(OtherEvent);

        assert_eq!(reader.queue_len(), 2);
        assert_eq!(reader.poll().len(), 2);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn test_drained_queue_never_evicts() {
        let bus = EventBus::new();
        let mut seen = 0;
        for i in 0..(MAX_QUEUE_SIZE as i32 * 3) {
            bus.emit(TestEvent { value: i });
            if bus.queue_len() == MAX_QUEUE_SIZE / 2 {
                seen += bus.poll().len();
            }
        }
        seen += bus.poll().len();
        assert_eq!(seen, MAX_QUEUE_SIZE * 3);
    }
}
