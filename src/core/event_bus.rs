//! Library event bus: synchronous notification of rename/removal to the
//! frames and instances that reference a library item by name.
//!
//! Architecture:
//! - Observer table keyed by item name, holding non-owning `Receiver`
//!   handles (uuid + kind), never references into the model.
//! - Registration happens wherever a stored name is attached (frame sound
//!   assignment, instance placement, load wiring); unregistration on every
//!   detach path.
//! - `notify_*` only maintains the table and returns the affected receiver
//!   set; the model owner routes the event to the actual frames/instances
//!   by id. Ids that no longer resolve during routing are pruned.
//!
//! The bus is owned by a `Library`, so notifications never cross documents.

use std::collections::HashMap;

use log::debug;
use uuid::Uuid;

/// What a receiver handle points at, so routing knows where to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// A `Frame` whose `sound_name` references the item.
    FrameSound,
    /// A symbol/bitmap instance whose `library_item_name` references the item.
    Instance,
}

/// Non-owning handle to a model object subscribed to one item name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receiver {
    pub id: Uuid,
    pub kind: ReceiverKind,
}

/// A library mutation worth broadcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    Renamed { old: String, new: String },
    Removed { name: String },
}

/// Item name → subscribed receivers.
#[derive(Debug, Default, Clone)]
pub struct LibraryEventBus {
    receivers: HashMap<String, Vec<Receiver>>,
}

impl LibraryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Registration ==========

    /// Subscribe `receiver` to events about `item_name`. Duplicate ids for
    /// the same name are collapsed.
    pub fn register(&mut self, item_name: &str, receiver: Receiver) {
        let entry = self.receivers.entry(item_name.to_string()).or_default();
        if !entry.iter().any(|r| r.id == receiver.id) {
            entry.push(receiver);
        }
    }

    /// Drop one receiver from one item's entry. No-op if absent.
    pub fn unregister(&mut self, item_name: &str, id: Uuid) {
        if let Some(entry) = self.receivers.get_mut(item_name) {
            entry.retain(|r| r.id != id);
            if entry.is_empty() {
                self.receivers.remove(item_name);
            }
        }
    }

    /// Drop the ids in `dead` from one item's entry (routing found them
    /// stale).
    pub fn prune(&mut self, item_name: &str, dead: &[Uuid]) {
        if dead.is_empty() {
            return;
        }
        debug!("bus: pruning {} stale receiver(s) for '{}'", dead.len(), item_name);
        if let Some(entry) = self.receivers.get_mut(item_name) {
            entry.retain(|r| !dead.contains(&r.id));
            if entry.is_empty() {
                self.receivers.remove(item_name);
            }
        }
    }

    // ========== Notification ==========

    /// Re-key the entry for a renamed item and return the receivers that
    /// should have the new name routed to them.
    pub fn notify_renamed(&mut self, old: &str, new: &str) -> Vec<Receiver> {
        let moved = self.receivers.remove(old).unwrap_or_default();
        if !moved.is_empty() {
            let entry = self.receivers.entry(new.to_string()).or_default();
            for r in &moved {
                if !entry.iter().any(|e| e.id == r.id) {
                    entry.push(*r);
                }
            }
        }
        moved
    }

    /// Drop the entry for a removed item and return its former receivers.
    pub fn notify_removed(&mut self, name: &str) -> Vec<Receiver> {
        self.receivers.remove(name).unwrap_or_default()
    }

    // ========== Queries ==========

    pub fn receiver_count(&self, item_name: &str) -> usize {
        self.receivers.get(item_name).map(Vec::len).unwrap_or(0)
    }

    pub fn is_registered(&self, item_name: &str, id: Uuid) -> bool {
        self.receivers
            .get(item_name)
            .map(|e| e.iter().any(|r| r.id == id))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(id: Uuid) -> Receiver {
        Receiver { id, kind: ReceiverKind::FrameSound }
    }

    #[test]
    fn test_register_dedupes_by_id() {
        let mut bus = LibraryEventBus::new();
        let id = Uuid::new_v4();
        bus.register("audio/click.wav", sound(id));
        bus.register("audio/click.wav", sound(id));
        assert_eq!(bus.receiver_count("audio/click.wav"), 1);
    }

    #[test]
    fn test_rename_rekeys_entry() {
        let mut bus = LibraryEventBus::new();
        let id = Uuid::new_v4();
        bus.register("old", sound(id));

        let moved = bus.notify_renamed("old", "new");
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, id);
        assert_eq!(bus.receiver_count("old"), 0);
        assert!(bus.is_registered("new", id));
    }

    #[test]
    fn test_removal_drops_entry() {
        let mut bus = LibraryEventBus::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        bus.register("item", sound(a));
        bus.register("item", Receiver { id: b, kind: ReceiverKind::Instance });

        let gone = bus.notify_removed("item");
        assert_eq!(gone.len(), 2);
        assert!(bus.is_empty());
        // Second removal delivers to nobody.
        assert!(bus.notify_removed("item").is_empty());
    }

    #[test]
    fn test_unregister_and_prune() {
        let mut bus = LibraryEventBus::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        bus.register("item", sound(a));
        bus.register("item", sound(b));

        bus.unregister("item", a);
        assert_eq!(bus.receiver_count("item"), 1);

        bus.prune("item", &[b]);
        assert!(bus.is_empty());
    }
}
