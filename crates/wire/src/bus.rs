// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed event bus: decoded envelope events fanned out to subscribers.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::envelope::{self, Envelope, EnvelopeEvent};

/// An envelope event tagged with the identifier of the peer that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub source: String,
    pub event: EnvelopeEvent,
}

impl BusEvent {
    /// JSON shape used by dashboard streams.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "source": self.source,
            "event": self.event.name(),
            "data": self.event.data(),
        })
    }
}

/// Selects which events a [`Subscription`] yields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// The whole-object `msg` event only.
    Msg,
    MsgKey(String),
    /// The whole-value `rta` event only.
    Rta,
    RtaAction(String),
    Err,
    /// Any of the given filters.
    AnyOf(Vec<EventFilter>),
}

impl EventFilter {
    /// Parse a comma-separated list of legacy event names
    /// (`msg`, `msg:<key>`, `rta`, `rta:<action>`, `err`, `all`).
    pub fn parse_list(list: &str) -> Self {
        let mut filters = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let filter = match name {
                "all" | "*" => return Self::All,
                "msg" => Self::Msg,
                "rta" => Self::Rta,
                "err" => Self::Err,
                other => match other.split_once(':') {
                    Some(("msg", key)) => Self::MsgKey(key.to_owned()),
                    Some(("rta", action)) => Self::RtaAction(action.to_owned()),
                    _ => continue,
                },
            };
            filters.push(filter);
        }
        match filters.len() {
            0 => Self::All,
            1 => filters.swap_remove(0),
            _ => Self::AnyOf(filters),
        }
    }

    pub fn matches(&self, event: &EnvelopeEvent) -> bool {
        match (self, event) {
            (Self::All, _) => true,
            (Self::Msg, EnvelopeEvent::Msg(_)) => true,
            (Self::MsgKey(want), EnvelopeEvent::MsgKey { key, .. }) => want == key,
            (Self::Rta, EnvelopeEvent::Rta(_)) => true,
            (Self::RtaAction(want), EnvelopeEvent::RtaAction { action, .. }) => want == action,
            (Self::Err, EnvelopeEvent::Err(_)) => true,
            (Self::AnyOf(filters), ev) => filters.iter().any(|f| f.matches(ev)),
            _ => false,
        }
    }
}

/// Broadcast hub for envelope events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish every fan-out event of `envelope` in order. Returns the number
    /// of events produced, whether or not anyone was listening.
    pub fn publish(&self, source: &str, envelope: &Envelope) -> usize {
        let events = envelope.events();
        let count = events.len();
        for event in events {
            // No subscribers is not an error.
            let _ = self.tx.send(BusEvent { source: source.to_owned(), event });
        }
        count
    }

    /// Decode a raw frame and publish it. Unparsable frames are dropped and
    /// produce no events.
    pub fn publish_raw(&self, source: &str, raw: &str) -> usize {
        match envelope::decode(raw) {
            Some(env) => self.publish(source, &env),
            None => {
                tracing::debug!(source, len = raw.len(), "dropping unparsable frame");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe(), filter: EventFilter::All }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// A filtered receiver of bus events.
pub struct Subscription {
    rx: broadcast::Receiver<BusEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub fn filtered(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Wait for the next matching event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) if self.filter.matches(&ev.event) => return Some(ev),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(lagged = n, "bus subscriber lagged, skipping");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(ev) if self.filter.matches(&ev.event) => return Some(ev),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
