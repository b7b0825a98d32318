//! Screen history.
//!
//! [`NavigationStack`] is a LIFO of [`ScreenState`] frames. The bottom frame
//! is the root of the session and can never be popped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use nabu_markup::ScreenDefinition;
use tokio::sync::broadcast;

use crate::context::ContextValue;

static NEXT_SCREEN_STATE_ID: AtomicU64 = AtomicU64::new(1);

const EVENT_CHANNEL_CAPACITY: usize = 32;

// ── ScreenStateId ─────────────────────────────────────────────────────────

/// Unique identifier of a navigation frame.
///
/// Two pushes of the same screen get distinct ids.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ScreenStateId(u64);

impl ScreenStateId {
    pub fn new() -> Self {
        ScreenStateId(NEXT_SCREEN_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ScreenStateId {
    fn default() -> Self {
        Self::new()
    }
}

// ── ScreenState ───────────────────────────────────────────────────────────

/// One frame of the navigation stack.
#[derive(Debug, Clone)]
pub struct ScreenState {
    pub id: ScreenStateId,
    pub screen: ScreenDefinition,
    /// Overrides visible only while this frame is on top.
    pub local: HashMap<String, ContextValue>,
    pub created_at: SystemTime,
}

impl ScreenState {
    pub fn new(screen: ScreenDefinition) -> Self {
        Self { id: ScreenStateId::new(), screen, local: HashMap::new(), created_at: SystemTime::now() }
    }

    pub fn with_local(mut self, local: HashMap<String, ContextValue>) -> Self {
        self.local = local;
        self
    }

    pub fn code(&self) -> &str {
        &self.screen.code
    }
}

// ── NavigationEvent ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Pushed { id: ScreenStateId, screen_code: String },
    Popped { id: ScreenStateId, screen_code: String },
}

// ── NavigationStack ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct NavigationStack {
    frames: Vec<ScreenState>,
    events: broadcast::Sender<NavigationEvent>,
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStack {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { frames: Vec::new(), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn push(&mut self, state: ScreenState) {
        log::debug!("push {} ({:?}), depth {}", state.code(), state.id, self.frames.len() + 1);
        let _ = self.events.send(NavigationEvent::Pushed { id: state.id, screen_code: state.screen.code.clone() });
        self.frames.push(state);
    }

    /// Remove the top frame and return the new top.
    ///
    /// Does nothing and returns `None` when only the root frame (or no frame)
    /// is left.
    pub fn pop(&mut self) -> Option<&ScreenState> {
        if !self.can_go_back() {
            return None;
        }
        let popped = self.frames.pop()?;
        log::debug!("pop {} ({:?}), depth {}", popped.code(), popped.id, self.frames.len());
        let _ = self.events.send(NavigationEvent::Popped { id: popped.id, screen_code: popped.screen.code });
        self.frames.last()
    }

    pub fn current(&self) -> Option<&ScreenState> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ScreenState> {
        self.frames.last_mut()
    }

    /// The frame below the top one.
    pub fn previous(&self) -> Option<&ScreenState> {
        self.frames.len().checked_sub(2).and_then(|i| self.frames.get(i))
    }

    pub fn can_go_back(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from root to top.
    pub fn iter(&self) -> impl Iterator<Item = &ScreenState> {
        self.frames.iter()
    }
}
