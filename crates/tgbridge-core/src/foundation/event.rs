//! Lifecycle event numbering and the generic event-handler bus.
//!
//! Event identifiers are plain integers handed out in blocks by a process-wide
//! [`EventBaseAuthority`]. The bridge allocates one block, named
//! [`LIFECYCLE_EVENT_NAME`], and derives its two [`LifecycleEvent`] ids from
//! it. The ids are fixed the first time they are read and never change for
//! the rest of the process.
//!
//! [`EventBus`] is the host-side facility that lets application code react to
//! these ids (for example, subscribing commands once the bot is connected).

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::foundation::error::panic_message;
use crate::foundation::user_data::UserData;

/// Numeric event identifier.
pub type EventId = u32;

/// Number of identifiers reserved per allocated base.
pub const EVENT_BLOCK_SIZE: EventId = 0x100;

/// Name under which the bridge allocates its lifecycle events.
pub const LIFECYCLE_EVENT_NAME: &str = "TGB";

const FIRST_EVENT_BASE: EventId = 0x0001_0000;

// =============================================================================
// Event Base Authority
// =============================================================================

/// Hands out non-overlapping blocks of event identifiers.
///
/// Allocation is idempotent per name: asking twice for the same name returns
/// the same base.
#[derive(Debug)]
pub struct EventBaseAuthority {
    next: EventId,
    bases: HashMap<String, EventId>,
}

impl Default for EventBaseAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBaseAuthority {
    /// Creates an authority with no allocations.
    pub fn new() -> Self {
        Self {
            next: FIRST_EVENT_BASE,
            bases: HashMap::new(),
        }
    }

    /// Returns the base for `name`, allocating a fresh block on first use.
    pub fn allocate(&mut self, name: &str) -> EventId {
        if let Some(base) = self.bases.get(name) {
            return *base;
        }
        let base = self.next;
        self.next += EVENT_BLOCK_SIZE;
        self.bases.insert(name.to_string(), base);
        debug!(name = %name, base = base, "Allocated event base");
        base
    }

    /// Returns the name owning the block that contains `id`.
    pub fn owner_of(&self, id: EventId) -> Option<&str> {
        self.bases
            .iter()
            .find(|(_, base)| (**base..**base + EVENT_BLOCK_SIZE).contains(&id))
            .map(|(name, _)| name.as_str())
    }
}

static AUTHORITY: LazyLock<Mutex<EventBaseAuthority>> =
    LazyLock::new(|| Mutex::new(EventBaseAuthority::new()));

/// Allocates (or looks up) an event base from the process-wide authority.
pub fn allocate_event_base(name: &str) -> EventId {
    AUTHORITY.lock().allocate(name)
}

// =============================================================================
// Lifecycle Events
// =============================================================================

/// Connection state changes raised by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The transport lost its connection.
    Disconnected,
    /// The transport completed its handshake and is delivering updates.
    Connected,
}

static LIFECYCLE_BASE: OnceLock<EventId> = OnceLock::new();

fn lifecycle_base() -> EventId {
    *LIFECYCLE_BASE.get_or_init(|| allocate_event_base(LIFECYCLE_EVENT_NAME))
}

impl LifecycleEvent {
    /// Both lifecycle events.
    pub const ALL: [Self; 2] = [Self::Disconnected, Self::Connected];

    /// Returns this event's process-wide identifier.
    pub fn id(self) -> EventId {
        lifecycle_base() + self.offset()
    }

    /// Maps an identifier back to a lifecycle event.
    pub fn from_id(id: EventId) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.id() == id)
    }

    fn offset(self) -> EventId {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
        }
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Handler invoked when an event id is triggered.
pub type EventHandlerFn = Arc<dyn Fn(EventId, &UserData) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    id: EventId,
    handler: EventHandlerFn,
    user_data: UserData,
}

/// Registry of handlers keyed by event id.
///
/// Handlers run synchronously in registration order. A panicking handler is
/// logged and does not stop the others.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Registration>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `id`.
    pub fn add_handler<F>(&self, id: EventId, handler: F, user_data: UserData)
    where
        F: Fn(EventId, &UserData) + Send + Sync + 'static,
    {
        self.handlers.write().push(Registration {
            id,
            handler: Arc::new(handler),
            user_data,
        });
    }

    /// Invokes every handler registered for `id`.
    ///
    /// Returns the number of handlers invoked.
    pub fn trigger(&self, id: EventId) -> usize {
        // Snapshot first so handlers may register further handlers.
        let matching: Vec<Registration> = self
            .handlers
            .read()
            .iter()
            .filter(|r| r.id == id)
            .cloned()
            .collect();

        debug!(event = id, handlers = matching.len(), "Triggering event");

        for registration in &matching {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                (registration.handler)(id, &registration.user_data)
            }));
            if let Err(payload) = result {
                warn!(
                    event = id,
                    error = %panic_message(payload.as_ref()),
                    "Event handler panicked"
                );
            }
        }

        matching.len()
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_authority_blocks_do_not_overlap() {
        let mut authority = EventBaseAuthority::new();
        let a = authority.allocate("AAA");
        let b = authority.allocate("BBB");
        assert_eq!(b - a, EVENT_BLOCK_SIZE);
        assert_eq!(authority.allocate("AAA"), a);
        assert_eq!(authority.owner_of(a + 1), Some("AAA"));
        assert_eq!(authority.owner_of(b + EVENT_BLOCK_SIZE - 1), Some("BBB"));
        assert_eq!(authority.owner_of(0), None);
    }

    #[test]
    fn test_lifecycle_ids_are_distinct_and_stable() {
        let base = allocate_event_base(LIFECYCLE_EVENT_NAME);
        let connected = LifecycleEvent::Connected.id();
        let disconnected = LifecycleEvent::Disconnected.id();

        assert_ne!(connected, disconnected);
        assert_eq!(disconnected, base);
        assert_eq!(connected, base + 1);
        for id in [connected, disconnected] {
            assert!((base..base + EVENT_BLOCK_SIZE).contains(&id));
        }
        assert_eq!(LifecycleEvent::Connected.id(), connected);
        assert_eq!(
            LifecycleEvent::from_id(connected),
            Some(LifecycleEvent::Connected)
        );
        assert_eq!(LifecycleEvent::from_id(base + 2), None);
    }

    #[test]
    fn test_bus_triggers_matching_handlers_only() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        bus.add_handler(
            10,
            move |id, data| {
                assert_eq!(id, 10);
                let step = data.downcast_ref::<usize>().copied().unwrap_or(1);
                h.fetch_add(step, Ordering::SeqCst);
            },
            UserData::new(5_usize),
        );
        let h = Arc::clone(&hits);
        bus.add_handler(
            11,
            move |_, _| {
                h.fetch_add(100, Ordering::SeqCst);
            },
            UserData::none(),
        );

        assert_eq!(bus.trigger(10), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert_eq!(bus.trigger(12), 0);
    }

    #[test]
    fn test_bus_survives_panicking_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.add_handler(1, |_, _| panic!("handler exploded"), UserData::none());
        let h = Arc::clone(&hits);
        bus.add_handler(
            1,
            move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
            },
            UserData::none(),
        );

        assert_eq!(bus.trigger(1), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
