//! Event channel - the funnel's observable notifications.
//!
//! There is exactly one event, `shutoff`, carrying no payload. Handlers are
//! called synchronously, in subscription order, from inside the funnel
//! operation that raised the event.

use std::fmt;
use std::str::FromStr;

use crate::error::FunnelError;

/// Events a funnel emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunnelEvent {
    /// No bucket can take the next chunk
    Shutoff,
}

impl FunnelEvent {
    /// Event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shutoff => "shutoff",
        }
    }
}

impl fmt::Display for FunnelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FunnelEvent {
    type Err = FunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shutoff" => Ok(Self::Shutoff),
            other => Err(FunnelError::UnknownEvent(other.to_string())),
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut() + Send>;

/// Subscriber list for funnel events
#[derive(Default)]
pub struct EventChannel {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, FunnelEvent, Handler)>,
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event
    pub fn subscribe<F>(&mut self, event: FunnelEvent, handler: F) -> SubscriptionId
    where
        F: FnMut() + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, event, Box::new(handler)));
        id
    }

    /// Remove a handler; false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Call every handler subscribed to `event`
    pub fn emit(&mut self, event: FunnelEvent) {
        for (_, subscribed, handler) in self.subscribers.iter_mut() {
            if *subscribed == event {
                handler();
            }
        }
    }

    /// Number of handlers for `event`
    pub fn subscriber_count(&self, event: FunnelEvent) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == event)
            .count()
    }
}
