//! A running microapp.
//!
//! [`Session`] ties a parsed [`Document`] to the mutable runtime state
//! ([`SessionState`]), the [`ActionDispatcher`] and the [`StyleRegistry`],
//! and produces the resolved component tree of the top screen.

use std::sync::Arc;

use nabu_markup::{Component, Document, UiAction};
use thiserror::Error;

use crate::action::{ActionDispatcher, DispatchError, Dispatched};
use crate::context::{ContextStore, ResolutionContext};
use crate::expr::resolve_value_expression;
use crate::logging::{LoggingConfig, init_logging};
use crate::navigation::{NavigationStack, ScreenState};
use crate::resolve::resolve_component;
use crate::style::{StyleRegistry, ThemeMode};

// ── EngineConfig ──────────────────────────────────────────────────────────

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Screen code pushed on start. `None` starts on the first screen.
    pub initial_screen: Option<String>,
    pub theme: ThemeMode,
    /// When set, the global logger is initialized on start.
    pub logging: Option<LoggingConfig>,
}

impl EngineConfig {
    pub fn with_initial_screen(mut self, code: impl Into<String>) -> Self {
        self.initial_screen = Some(code.into());
        self
    }

    pub fn with_theme(mut self, theme: ThemeMode) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("document has no screens")]
    NoScreens,
    #[error("initial screen `{0}` not found")]
    InitialScreenNotFound(String),
}

// ── SessionState ──────────────────────────────────────────────────────────

/// Everything an action may change.
#[derive(Debug, Default)]
pub struct SessionState {
    pub navigation: NavigationStack,
    pub context: ContextStore,
}

impl SessionState {
    /// Resolution snapshot for the top frame.
    pub fn resolution_context(&self) -> ResolutionContext {
        match self.navigation.current() {
            Some(frame) => self.context.snapshot(&frame.local),
            None => self.context.snapshot(&Default::default()),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────

pub struct Session {
    document: Arc<Document>,
    state: SessionState,
    dispatcher: ActionDispatcher,
    styles: StyleRegistry,
    theme: ThemeMode,
}

impl Session {
    /// Push the initial screen and return the running session.
    ///
    /// The default dispatcher looks screens up in `document`, rejects
    /// external deeplinks and has no native executor; see
    /// [`Session::with_dispatcher`].
    pub fn start(document: Arc<Document>, config: EngineConfig) -> Result<Self, SessionError> {
        if let Some(logging) = config.logging {
            init_logging(logging);
        }

        let initial = match &config.initial_screen {
            Some(code) => document
                .screen(code)
                .ok_or_else(|| SessionError::InitialScreenNotFound(code.clone()))?,
            None => document.screens.first().ok_or(SessionError::NoScreens)?,
        };

        let mut state = SessionState::default();
        state.navigation.push(ScreenState::new(initial.clone()));
        log::info!("session started on `{}` ({} screens)", initial.code, document.screens.len());

        Ok(Self {
            dispatcher: ActionDispatcher::new(document.clone()),
            styles: StyleRegistry::new(document.styles.clone()),
            theme: config.theme,
            document,
            state,
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: ActionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub async fn dispatch(&mut self, action: &UiAction) -> Result<Dispatched, DispatchError> {
        self.dispatcher.dispatch(action, &mut self.state).await
    }

    pub fn current_screen(&self) -> Option<&ScreenState> {
        self.state.navigation.current()
    }

    /// Resolved copy of the top screen's component tree.
    pub fn current_tree(&self) -> Option<Component> {
        let root = self.current_screen()?.screen.root.as_ref()?;
        Some(resolve_component(root, &self.state.resolution_context()))
    }

    /// Resolve a single value against the top frame.
    pub fn resolve(&self, raw: &str) -> String {
        resolve_value_expression(raw, &self.state.resolution_context())
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }
}
