//! Action dispatch.
//!
//! [`ActionDispatcher`] turns a [`UiAction`] into changes of a
//! [`SessionState`]: navigation pushes and pops, context writes, hand-offs to
//! the host. Host behavior comes in through three collaborators fixed at
//! construction:
//!
//! | Trait | Used by |
//! |-------|---------|
//! | [`ScreenProvider`] | `openScreen`, `openDeeplink` |
//! | [`ExternalDeeplinkHandler`] | `openDeeplink` when no screen matches |
//! | [`NativeActionExecutor`] | `nativeCode` |
//!
//! A dispatch either applies completely or not at all. Every fallible step
//! (lookups, the awaited executor call) runs before the first mutation, so a
//! failed, panicking or dropped dispatch leaves the session as it was.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use nabu_markup::{Document, ScreenDefinition, UiAction};
use thiserror::Error;

use crate::context::{ContextValue, VariablePath};
use crate::navigation::ScreenState;
use crate::session::SessionState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Collaborators ─────────────────────────────────────────────────────────

/// Screen lookup by code or by deeplink.
pub trait ScreenProvider: Send + Sync {
    fn find_screen(&self, code: &str) -> Option<ScreenDefinition>;

    /// `uri` never carries a `?query` part.
    fn find_screen_by_deeplink(&self, uri: &str) -> Option<ScreenDefinition>;
}

impl ScreenProvider for Document {
    fn find_screen(&self, code: &str) -> Option<ScreenDefinition> {
        self.screen(code).cloned()
    }

    fn find_screen_by_deeplink(&self, uri: &str) -> Option<ScreenDefinition> {
        self.screens.iter().find(|s| s.deeplink.as_deref() == Some(uri)).cloned()
    }
}

/// Handles deeplinks that no screen of the microapp claims.
pub trait ExternalDeeplinkHandler: Send + Sync {
    /// `true` when the host took care of `uri`.
    fn handle(&self, uri: &str) -> bool;
}

impl<F> ExternalDeeplinkHandler for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn handle(&self, uri: &str) -> bool {
        self(uri)
    }
}

/// Outcome of a host-implemented native action.
#[derive(Debug)]
pub enum NativeActionResult {
    /// Returned entries are written to the context, keys addressed like
    /// [`VariablePath`].
    Success(Option<HashMap<String, ContextValue>>),
    Error { message: String, cause: Option<BoxError> },
}

impl NativeActionResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into(), cause: None }
    }
}

#[async_trait]
pub trait NativeActionExecutor: Send + Sync {
    async fn execute(&self, code: &str, params: &BTreeMap<String, String>) -> NativeActionResult;
}

type NativeHandler = Box<dyn Fn(&BTreeMap<String, String>) -> NativeActionResult + Send + Sync>;

/// [`NativeActionExecutor`] backed by per-code closures.
#[derive(Default)]
pub struct NativeActionRegistry {
    handlers: HashMap<String, NativeHandler>,
}

impl NativeActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `code`, replacing any previous one.
    pub fn register<F>(&mut self, code: &str, handler: F)
    where
        F: Fn(&BTreeMap<String, String>) -> NativeActionResult + Send + Sync + 'static,
    {
        self.handlers.insert(code.to_string(), Box::new(handler));
    }

    pub fn with<F>(mut self, code: &str, handler: F) -> Self
    where
        F: Fn(&BTreeMap<String, String>) -> NativeActionResult + Send + Sync + 'static,
    {
        self.register(code, handler);
        self
    }

    pub fn contains(&self, code: &str) -> bool {
        self.handlers.contains_key(code)
    }
}

#[async_trait]
impl NativeActionExecutor for NativeActionRegistry {
    async fn execute(&self, code: &str, params: &BTreeMap<String, String>) -> NativeActionResult {
        match self.handlers.get(code) {
            Some(handler) => handler(params),
            None => NativeActionResult::error(format!("no native action registered for `{code}`")),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────

/// What a successful dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A frame was pushed or popped.
    Navigated,
    /// The host handled a deeplink.
    ExternalDeeplink,
    ContextUpdated,
    /// Accepted without side effects.
    NoEffect,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("screen `{code}` not found")]
    ScreenNotFound { code: String },

    #[error("already at the root screen")]
    AtRoot,

    #[error("no screen or host handler for deeplink `{uri}`")]
    DeeplinkUnhandled { uri: String },

    #[error("context has no value for `{key}`")]
    SourceMissing { key: String },

    #[error("no native executor for action `{code}`")]
    NoExecutor { code: String },

    #[error("native action failed: {message}")]
    HostExecutorFailure {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("unexpected failure: {message}")]
    Unexpected {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

/// Panic raised by a collaborator while an action was applied.
#[derive(Debug, Error)]
#[error("panicked: {0}")]
pub struct Panicked(pub String);

// ── Dispatcher ────────────────────────────────────────────────────────────

pub struct ActionDispatcher {
    screens: Arc<dyn ScreenProvider>,
    deeplinks: Arc<dyn ExternalDeeplinkHandler>,
    native: Option<Arc<dyn NativeActionExecutor>>,
}

impl ActionDispatcher {
    /// A dispatcher that rejects external deeplinks and has no native
    /// executor.
    pub fn new(screens: Arc<dyn ScreenProvider>) -> Self {
        Self { screens, deeplinks: Arc::new(|_: &str| false), native: None }
    }

    pub fn with_deeplink_handler(mut self, handler: Arc<dyn ExternalDeeplinkHandler>) -> Self {
        self.deeplinks = handler;
        self
    }

    pub fn with_native_executor(mut self, executor: Arc<dyn NativeActionExecutor>) -> Self {
        self.native = Some(executor);
        self
    }

    /// Apply `action` to `state`.
    ///
    /// Panics raised by collaborators are caught and reported as
    /// [`DispatchError::Unexpected`].
    pub async fn dispatch(&self, action: &UiAction, state: &mut SessionState) -> Result<Dispatched, DispatchError> {
        log::debug!("dispatch {}", action.type_code());
        let result = match AssertUnwindSafe(self.apply(action, state)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let panicked = Panicked(panic_message(&*payload));
                Err(DispatchError::Unexpected {
                    message: format!("`{}` {panicked}", action.type_code()),
                    cause: Some(Box::new(panicked)),
                })
            }
        };
        if let Err(e) = &result {
            log::warn!("{} failed: {e}", action.type_code());
        }
        result
    }

    async fn apply(&self, action: &UiAction, state: &mut SessionState) -> Result<Dispatched, DispatchError> {
        match action {
            UiAction::OpenScreen { screen_code } => {
                let screen = self
                    .screens
                    .find_screen(screen_code)
                    .ok_or_else(|| DispatchError::ScreenNotFound { code: screen_code.clone() })?;
                state.navigation.push(ScreenState::new(screen));
                Ok(Dispatched::Navigated)
            }

            UiAction::Back => match state.navigation.pop() {
                Some(_) => Ok(Dispatched::Navigated),
                None => Err(DispatchError::AtRoot),
            },

            UiAction::OpenDeeplink { uri } => {
                let (path, query) = split_deeplink(uri);
                if let Some(screen) = self.screens.find_screen_by_deeplink(path) {
                    state.navigation.push(ScreenState::new(screen).with_local(query));
                    return Ok(Dispatched::Navigated);
                }
                if self.deeplinks.handle(uri) {
                    Ok(Dispatched::ExternalDeeplink)
                } else {
                    Err(DispatchError::DeeplinkUnhandled { uri: uri.clone() })
                }
            }

            UiAction::SaveToContext { value_from, value_to } => {
                let mut merged = state.navigation.current().map(|f| f.local.clone()).unwrap_or_default();
                merged.extend(state.context.flatten());
                let value = merged
                    .remove(value_from)
                    .ok_or_else(|| DispatchError::SourceMissing { key: value_from.clone() })?;
                state.context.set_path(&VariablePath::parse(value_to), value);
                Ok(Dispatched::ContextUpdated)
            }

            UiAction::DataTransform { variable_name, new_value } => {
                state
                    .context
                    .set_path(&VariablePath::parse(variable_name), ContextValue::parse_literal(new_value));
                Ok(Dispatched::ContextUpdated)
            }

            UiAction::NativeCode { action_code, parameters } => {
                let executor = self
                    .native
                    .as_ref()
                    .ok_or_else(|| DispatchError::NoExecutor { code: action_code.clone() })?;
                match executor.execute(action_code, parameters).await {
                    NativeActionResult::Success(Some(data)) => {
                        for (key, value) in data {
                            state.context.set_path(&VariablePath::parse(&key), value);
                        }
                        Ok(Dispatched::ContextUpdated)
                    }
                    NativeActionResult::Success(None) => Ok(Dispatched::NoEffect),
                    NativeActionResult::Error { message, cause } => {
                        Err(DispatchError::HostExecutorFailure { message, cause })
                    }
                }
            }

            // Reserved for query execution.
            UiAction::RefreshScreen { .. } | UiAction::ExecuteQuery { .. } => Ok(Dispatched::NoEffect),

            UiAction::OpenBottomSheet | UiAction::RefreshWidget | UiAction::RefreshLayout | UiAction::Empty => {
                Ok(Dispatched::NoEffect)
            }
        }
    }
}

/// Split `scheme://host/path?a=1&b` into the path part and its query
/// parameters. Parameters without `=` map to an empty string.
fn split_deeplink(uri: &str) -> (&str, HashMap<String, ContextValue>) {
    let Some((path, query)) = uri.split_once('?') else {
        return (uri, HashMap::new());
    };
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_string(), ContextValue::from(v))
        })
        .collect();
    (path, params)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    const SCREENS: &[(&str, Option<&str>)] =
        &[("home", None), ("detail", Some("app://shop/detail")), ("cart", Some("app://shop/cart"))];

    fn document() -> Arc<Document> {
        let screens = SCREENS
            .iter()
            .map(|(code, link)| ScreenDefinition {
                code: code.to_string(),
                title: code.to_string(),
                deeplink: link.map(str::to_string),
                root: None,
                queries: Vec::new(),
            })
            .collect();
        Arc::new(Document { screens, ..Document::default() })
    }

    fn session() -> (ActionDispatcher, SessionState) {
        let doc = document();
        let mut state = SessionState::default();
        state.navigation.push(ScreenState::new(doc.screens[0].clone()));
        (ActionDispatcher::new(doc), state)
    }

    fn top(state: &SessionState) -> &str {
        state.navigation.current().map(ScreenState::code).unwrap_or_default()
    }

    fn native(code: &str) -> UiAction {
        UiAction::NativeCode { action_code: code.into(), parameters: BTreeMap::new() }
    }

    struct Pending;

    #[async_trait]
    impl NativeActionExecutor for Pending {
        async fn execute(&self, _: &str, _: &BTreeMap<String, String>) -> NativeActionResult {
            futures::future::pending::<()>().await;
            NativeActionResult::Success(None)
        }
    }

    struct Panics;

    #[async_trait]
    impl NativeActionExecutor for Panics {
        async fn execute(&self, code: &str, _: &BTreeMap<String, String>) -> NativeActionResult {
            panic!("executor exploded on {code}");
        }
    }

    // ── navigation ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn open_screen_pushes() {
        let (d, mut s) = session();
        let out = d.dispatch(&UiAction::OpenScreen { screen_code: "detail".into() }, &mut s).await;
        assert_eq!(out.unwrap(), Dispatched::Navigated);
        assert_eq!(top(&s), "detail");
        assert_eq!(s.navigation.len(), 2);
    }

    #[tokio::test]
    async fn open_missing_screen_leaves_stack_alone() {
        let (d, mut s) = session();
        let err = d.dispatch(&UiAction::OpenScreen { screen_code: "missing".into() }, &mut s).await;
        assert!(matches!(err, Err(DispatchError::ScreenNotFound { code }) if code == "missing"));
        assert_eq!(s.navigation.len(), 1);
    }

    #[tokio::test]
    async fn back_pops_until_root() {
        let (d, mut s) = session();
        d.dispatch(&UiAction::OpenScreen { screen_code: "detail".into() }, &mut s).await.unwrap();
        assert_eq!(d.dispatch(&UiAction::Back, &mut s).await.unwrap(), Dispatched::Navigated);
        assert!(matches!(d.dispatch(&UiAction::Back, &mut s).await, Err(DispatchError::AtRoot)));
        assert_eq!(top(&s), "home");
    }

    // ── deeplinks ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn internal_deeplink_pushes_with_query_as_local_data() {
        let (d, mut s) = session();
        let action = UiAction::OpenDeeplink { uri: "app://shop/detail?id=42&ref".into() };
        assert_eq!(d.dispatch(&action, &mut s).await.unwrap(), Dispatched::Navigated);

        let frame = s.navigation.current().unwrap();
        assert_eq!(frame.code(), "detail");
        assert_eq!(frame.local["id"], ContextValue::from("42"));
        assert_eq!(frame.local["ref"], ContextValue::from(""));
    }

    #[tokio::test]
    async fn external_deeplink_handled_by_host() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let (d, mut s) = session();
        let d = d.with_deeplink_handler(Arc::new(move |uri: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
            uri.starts_with("https://")
        }));

        let ok = d.dispatch(&UiAction::OpenDeeplink { uri: "https://example.com".into() }, &mut s).await;
        assert_eq!(ok.unwrap(), Dispatched::ExternalDeeplink);

        let err = d.dispatch(&UiAction::OpenDeeplink { uri: "ftp://nope".into() }, &mut s).await;
        assert!(matches!(err, Err(DispatchError::DeeplinkUnhandled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(s.navigation.len(), 1);
    }

    #[tokio::test]
    async fn internal_deeplink_skips_host() {
        let (d, mut s) = session();
        let d = d.with_deeplink_handler(Arc::new(|_: &str| -> bool { panic!("host must not be asked") }));
        let out = d.dispatch(&UiAction::OpenDeeplink { uri: "app://shop/cart".into() }, &mut s).await;
        assert_eq!(out.unwrap(), Dispatched::Navigated);
    }

    // ── context ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn save_to_context_copies_value() {
        let (d, mut s) = session();
        s.context.set_microapp_variable("shop", "picked", "sku-1");
        let action = UiAction::SaveToContext { value_from: "shop.picked".into(), value_to: "shop.cart".into() };
        assert_eq!(d.dispatch(&action, &mut s).await.unwrap(), Dispatched::ContextUpdated);
        assert_eq!(s.context.get_microapp_variable("shop", "cart"), Some(&ContextValue::from("sku-1")));
    }

    #[tokio::test]
    async fn save_to_context_reads_frame_local_data() {
        let (d, mut s) = session();
        d.dispatch(&UiAction::OpenDeeplink { uri: "app://shop/detail?id=7".into() }, &mut s).await.unwrap();
        let action = UiAction::SaveToContext { value_from: "id".into(), value_to: "lastId".into() };
        d.dispatch(&action, &mut s).await.unwrap();
        assert_eq!(s.context.get_engine_variable("lastId"), Some(&ContextValue::from("7")));
    }

    #[tokio::test]
    async fn context_wins_over_local_data() {
        let (d, mut s) = session();
        d.dispatch(&UiAction::OpenDeeplink { uri: "app://shop/detail?id=local".into() }, &mut s).await.unwrap();
        s.context.set_engine_variable("id", "global");
        let action = UiAction::SaveToContext { value_from: "id".into(), value_to: "out".into() };
        d.dispatch(&action, &mut s).await.unwrap();
        assert_eq!(s.context.get_engine_variable("out"), Some(&ContextValue::from("global")));
    }

    #[tokio::test]
    async fn save_missing_source_changes_nothing() {
        let (d, mut s) = session();
        s.context.set_engine_variable("keep", 1i64);
        let before = s.context.flatten();
        let action = UiAction::SaveToContext { value_from: "nope".into(), value_to: "out".into() };
        let err = d.dispatch(&action, &mut s).await;
        assert!(matches!(err, Err(DispatchError::SourceMissing { key }) if key == "nope"));
        assert_eq!(s.context.flatten(), before);
    }

    #[tokio::test]
    async fn data_transform_writes_typed_literal() {
        let (d, mut s) = session();
        let action = UiAction::DataTransform { variable_name: "shop.page".into(), new_value: "2".into() };
        d.dispatch(&action, &mut s).await.unwrap();
        let action = UiAction::DataTransform { variable_name: "flag".into(), new_value: "true".into() };
        d.dispatch(&action, &mut s).await.unwrap();
        assert_eq!(s.context.get_microapp_variable("shop", "page"), Some(&ContextValue::Number(2.0)));
        assert_eq!(s.context.get_engine_variable("flag"), Some(&ContextValue::Boolean(true)));
    }

    // ── native code ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn native_without_executor() {
        let (d, mut s) = session();
        let err = d.dispatch(&native("share"), &mut s).await;
        assert!(matches!(err, Err(DispatchError::NoExecutor { code }) if code == "share"));
    }

    #[tokio::test]
    async fn native_success_merges_data() {
        let registry = NativeActionRegistry::new().with("scan", |params| {
            let mut data = HashMap::new();
            data.insert("shop.code".to_string(), ContextValue::from(params["prefix"].as_str()));
            data.insert("scanned".to_string(), ContextValue::from(true));
            NativeActionResult::Success(Some(data))
        });
        assert!(registry.contains("scan"));
        assert!(!registry.contains("pay"));
        let (d, mut s) = session();
        let d = d.with_native_executor(Arc::new(registry));

        let mut parameters = BTreeMap::new();
        parameters.insert("prefix".to_string(), "QR".to_string());
        let action = UiAction::NativeCode { action_code: "scan".into(), parameters };

        assert_eq!(d.dispatch(&action, &mut s).await.unwrap(), Dispatched::ContextUpdated);
        assert_eq!(s.context.get_microapp_variable("shop", "code"), Some(&ContextValue::from("QR")));
        assert_eq!(s.context.get_engine_variable("scanned"), Some(&ContextValue::Boolean(true)));
    }

    #[tokio::test]
    async fn native_error_is_host_failure() {
        let registry = NativeActionRegistry::new().with("pay", |_| NativeActionResult::Error {
            message: "declined".into(),
            cause: Some("card expired".into()),
        });
        let (d, mut s) = session();
        let d = d.with_native_executor(Arc::new(registry));

        let err = d.dispatch(&native("pay"), &mut s).await.unwrap_err();
        let DispatchError::HostExecutorFailure { message, cause } = &err else { panic!("got {err:?}") };
        assert_eq!(message, "declined");
        assert_eq!(cause.as_ref().map(|c| c.to_string()).as_deref(), Some("card expired"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn unregistered_native_code_is_host_failure() {
        let (d, mut s) = session();
        let d = d.with_native_executor(Arc::new(NativeActionRegistry::new()));
        assert!(matches!(
            d.dispatch(&native("nope"), &mut s).await,
            Err(DispatchError::HostExecutorFailure { .. })
        ));
    }

    #[tokio::test]
    async fn panicking_executor_is_unexpected() {
        let (d, mut s) = session();
        let d = d.with_native_executor(Arc::new(Panics));
        let err = d.dispatch(&native("boom"), &mut s).await.unwrap_err();
        let cause = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<Panicked>());
        assert_eq!(cause.map(|p| p.0.as_str()), Some("executor exploded on boom"));
        let DispatchError::Unexpected { message, .. } = err else { panic!("got {err:?}") };
        assert!(message.contains("executor exploded on boom"));
        assert_eq!(s.navigation.len(), 1);
    }

    #[tokio::test]
    async fn dropped_dispatch_changes_nothing() {
        let (d, mut s) = session();
        let d = d.with_native_executor(Arc::new(Pending));
        s.context.set_engine_variable("keep", "yes");
        let before = s.context.flatten();

        let action = native("slow");
        let pending = d.dispatch(&action, &mut s);
        assert!(tokio::time::timeout(Duration::from_millis(20), pending).await.is_err());
        assert_eq!(s.context.flatten(), before);
    }

    // ── inert actions ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn inert_actions_succeed_without_effect() {
        let (d, mut s) = session();
        let inert = [
            UiAction::RefreshScreen { screen_code: "home".into() },
            UiAction::ExecuteQuery { query_code: "products".into() },
            UiAction::OpenBottomSheet,
            UiAction::RefreshWidget,
            UiAction::RefreshLayout,
            UiAction::Empty,
        ];
        for action in &inert {
            assert_eq!(d.dispatch(action, &mut s).await.unwrap(), Dispatched::NoEffect);
        }
        assert_eq!(s.navigation.len(), 1);
        assert!(s.context.flatten().is_empty());
    }

    #[test]
    fn deeplink_split() {
        let (path, query) = split_deeplink("app://x/y");
        assert_eq!(path, "app://x/y");
        assert!(query.is_empty());

        let (path, query) = split_deeplink("app://x/y?a=1&&b=2=3");
        assert_eq!(path, "app://x/y");
        assert_eq!(query["a"], ContextValue::from("1"));
        assert_eq!(query["b"], ContextValue::from("2=3"));
    }
}
