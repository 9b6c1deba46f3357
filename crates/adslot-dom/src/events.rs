//! Custom Events
//!
//! Named events with an optional JSON `detail`, dispatched to listeners
//! registered on a bus. Listeners run outside the bus borrow so they may
//! add or remove listeners while handling an event.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Custom DOM event
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub event_type: String,
    pub detail: Option<serde_json::Value>,
}

impl CustomEvent {
    pub fn new(event_type: &str) -> Self {
        Self { event_type: event_type.to_string(), detail: None }
    }

    pub fn with_detail(event_type: &str, detail: serde_json::Value) -> Self {
        Self { event_type: event_type.to_string(), detail: Some(detail) }
    }
}

/// Listener handle, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener options
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    /// Remove after the first dispatch
    pub once: bool,
}

pub type Listener = Rc<dyn Fn(&CustomEvent)>;

struct Registration {
    id: ListenerId,
    listener: Listener,
    once: bool,
}

/// Event bus keyed by event type
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: HashMap<String, Vec<Registration>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, event_type: &str, listener: Listener, options: ListenerOptions) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Registration { id, listener, once: options.once });
        id
    }

    /// Remove a listener, returns whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for regs in self.listeners.values_mut() {
            let before = regs.len();
            regs.retain(|r| r.id != id);
            removed |= before != regs.len();
        }
        removed
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, Vec::len)
    }

    /// Take the listeners to call for one dispatch, dropping `once` ones
    fn listeners_for(&mut self, event_type: &str) -> Vec<Listener> {
        let Some(regs) = self.listeners.get_mut(event_type) else {
            return Vec::new();
        };
        let listeners = regs.iter().map(|r| r.listener.clone()).collect();
        regs.retain(|r| !r.once);
        listeners
    }

    /// Dispatch an event, returns how many listeners ran
    pub fn dispatch(bus: &RefCell<EventBus>, event: &CustomEvent) -> usize {
        let listeners = bus.borrow_mut().listeners_for(&event.event_type);
        tracing::debug!(event = %event.event_type, listeners = listeners.len(), "dispatching event");
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_once_listener() {
        let bus = RefCell::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bus.borrow_mut().add_listener(
            "liveblog:blocks-updated",
            Rc::new(move |_| h.set(h.get() + 1)),
            ListenerOptions { once: true },
        );

        let event = CustomEvent::new("liveblog:blocks-updated");
        assert_eq!(EventBus::dispatch(&bus, &event), 1);
        assert_eq!(EventBus::dispatch(&bus, &event), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let bus = Rc::new(RefCell::new(EventBus::new()));
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let (b, s) = (bus.clone(), slot.clone());
        let id = bus.borrow_mut().add_listener(
            "resize",
            Rc::new(move |_| {
                if let Some(id) = s.get() {
                    b.borrow_mut().remove_listener(id);
                }
            }),
            ListenerOptions::default(),
        );
        slot.set(Some(id));

        EventBus::dispatch(&bus, &CustomEvent::new("resize"));
        assert_eq!(bus.borrow().listener_count("resize"), 0);
    }
}
