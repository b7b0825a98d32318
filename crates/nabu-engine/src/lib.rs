//! Runtime for **Nabu** microapps.
//!
//! Takes a parsed [`nabu_markup::Document`] and runs it: evaluates bindings,
//! looks up styles, keeps navigation history and applies user actions.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`context`] | `ContextStore` (engine and microapp variables), `ResolutionContext` |
//! | [`expr`] | `resolve_value_expression`: `@{scope.name}`, `@@{name}`, `*if(..)*then(..)*else(..)` |
//! | [`style`] | `StyleRegistry`, `Rgba`, `ResolvedStyles` |
//! | [`resolve`] | `resolve_component`: resolved copies of component trees, loop unrolling |
//! | [`navigation`] | `NavigationStack`, `ScreenState` |
//! | [`action`] | `ActionDispatcher` and its host collaborator traits |
//! | [`session`] | `Session`: a document plus its runtime state |
//! | [`logging`] | `init_logging` |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use nabu_engine::session::{EngineConfig, Session};
//! use nabu_markup::{MarkupBundle, UiAction};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let document = Arc::new(MarkupBundle::load_dir("microapps/shop")?.parse());
//! let mut session = Session::start(document, EngineConfig::default())?;
//!
//! session.state_mut().context.set_microapp_variable("shop", "user", "Ada");
//! let tree = session.current_tree();
//! session.dispatch(&UiAction::OpenScreen { screen_code: "detail".into() }).await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod context;
pub mod expr;
pub mod logging;
pub mod navigation;
pub mod resolve;
pub mod session;
pub mod style;

pub use action::{
    ActionDispatcher, DispatchError, Dispatched, ExternalDeeplinkHandler, NativeActionExecutor,
    NativeActionRegistry, NativeActionResult, Panicked, ScreenProvider,
};
pub use context::{ContextChange, ContextStore, ContextValue, ResolutionContext, VariablePath};
pub use expr::resolve_value_expression;
pub use navigation::{NavigationEvent, NavigationStack, ScreenState, ScreenStateId};
pub use resolve::resolve_component;
pub use session::{EngineConfig, Session, SessionError, SessionState};
pub use style::{ResolvedStyles, Rgba, StyleRegistry, ThemeMode};
