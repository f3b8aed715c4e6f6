//! Typed publish/subscribe for feature modules
//!
//! Modules register interest in specific [`EventKind`]s. The controller
//! walks modules in attach order and delivers an event only to those
//! subscribed to its kind, so delivery order follows attach order.

use crate::player::{EventKind, ModuleName};
use log::debug;

/// Most events one dispatch round may deliver. Events beyond this are
/// dropped with a warning, which stops handlers that keep re-emitting from
/// looping forever.
pub const MAX_EVENTS_PER_DISPATCH: usize = 64;

/// Handle for a single subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
struct Subscription {
    id: SubscriptionId,
    module: ModuleName,
    kind: EventKind,
}

/// Subscription table for one player
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `module` to `kind`. Subscribing twice returns the
    /// existing handle.
    pub fn subscribe(&mut self, module: ModuleName, kind: EventKind) -> SubscriptionId {
        if let Some(existing) = self
            .subscriptions
            .iter()
            .find(|s| s.module == module && s.kind == kind)
        {
            return existing.id;
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, module, kind });
        id
    }

    /// Remove one subscription; returns whether it existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Remove every subscription held by `module`; returns how many
    pub fn unsubscribe_module(&mut self, module: ModuleName) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.module != module);
        let removed = before - self.subscriptions.len();
        if removed > 0 {
            debug!("Removed {} subscriptions for {}", removed, module);
        }
        removed
    }

    pub fn is_subscribed(&self, module: ModuleName, kind: EventKind) -> bool {
        self.subscriptions
            .iter()
            .any(|s| s.module == module && s.kind == kind)
    }

    /// Number of modules listening for `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }
}
