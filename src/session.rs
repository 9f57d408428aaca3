//! Session-scoped conversation state.
//!
//! Each session carries two independent histories, one per route, so a
//! policy lookup never leaks into small talk and vice versa. Histories are
//! bounded to the most recent exchanges; sessions are passed explicitly into
//! responders, never held as process globals.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One user/assistant pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Rolling window over the last `max_exchanges` exchanges, oldest first.
#[derive(Clone, Debug)]
pub struct BoundedHistory {
    exchanges: VecDeque<Exchange>,
    max_exchanges: usize,
}

impl BoundedHistory {
    /// How many exchanges a route keeps by default.
    pub const DEFAULT_EXCHANGES: usize = 5;

    pub fn new(max_exchanges: usize) -> Self {
        Self {
            exchanges: VecDeque::new(),
            max_exchanges: max_exchanges.max(1),
        }
    }

    /// Records a completed exchange, evicting the oldest on overflow.
    /// Failed exchanges are never recorded; callers only reach this after a
    /// response was actually produced.
    pub fn record(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.exchanges.len() == self.max_exchanges {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Renders the history as a plain transcript for prompt assembly.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for exchange in &self.exchanges {
            out.push_str("User: ");
            out.push_str(&exchange.user);
            out.push_str("\nAssistant: ");
            out.push_str(&exchange.assistant);
            out.push('\n');
        }
        out
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXCHANGES)
    }
}

/// Citation back to a stored chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
}

/// Per-session state: one history per route plus the sources shown last.
#[derive(Clone, Debug, Default)]
pub struct Session {
    grounded: BoundedHistory,
    general: BoundedHistory,
    last_sources: Vec<SourceRef>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grounded_history(&self) -> &BoundedHistory {
        &self.grounded
    }

    pub fn general_history(&self) -> &BoundedHistory {
        &self.general
    }

    /// Sources cited by the most recent grounded response.
    pub fn last_sources(&self) -> &[SourceRef] {
        &self.last_sources
    }

    pub(crate) fn record_grounded(&mut self, user: &str, assistant: &str) {
        self.grounded.record(user, assistant);
    }

    pub(crate) fn record_general(&mut self, user: &str, assistant: &str) {
        self.general.record(user, assistant);
    }

    pub(crate) fn set_last_sources(&mut self, sources: Vec<SourceRef>) {
        self.last_sources = sources;
    }
}
