//! The parsed document model.
//!
//! Everything here is plain data produced once by [`crate::parse`]. The engine
//! resolves bindings into copies; a [`Document`] is never mutated in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Document ──────────────────────────────────────────────────────────────

/// A parsed microapp: metadata, screens, queries and styles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `None` when the microapp section was missing or failed to parse.
    pub microapp: Option<Microapp>,
    pub screens: Vec<ScreenDefinition>,
    pub queries: Vec<Query>,
    pub screen_queries: Vec<ScreenQuery>,
    pub styles: StyleSet,
}

impl Document {
    pub fn screen(&self, code: &str) -> Option<&ScreenDefinition> {
        self.screens.iter().find(|s| s.code == code)
    }

    pub fn query(&self, code: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.code == code)
    }

    /// Code of the microapp, or `""` when the microapp section is absent.
    pub fn microapp_code(&self) -> &str {
        self.microapp.as_ref().map(|m| m.code.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microapp {
    pub title: String,
    pub code: String,
    pub deeplink: Option<String>,
}

// ── Screen ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDefinition {
    pub code: String,
    pub title: String,
    pub deeplink: Option<String>,
    /// `None` renders as an empty screen.
    pub root: Option<Component>,
    /// Queries bound to this screen, sorted by [`ScreenQuery::order`].
    #[serde(default)]
    pub queries: Vec<ScreenQuery>,
}

// ── Component ─────────────────────────────────────────────────────────────

/// A node of a screen's component tree.
///
/// Serialized as an internally tagged union: `{"type": "layout", ...}` or
/// `{"type": "widget", ...}`. See [`crate::codec`] for the untagged fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Component {
    Layout(Layout),
    Widget(Widget),
}

impl Component {
    pub fn children(&self) -> &[Component] {
        match self {
            Component::Layout(layout) => &layout.children,
            Component::Widget(_) => &[],
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Component::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutKind {
    #[default]
    Vertical,
    Horizontal,
    /// Children stacked on top of each other.
    Layered,
    ForLoopVertical,
    ForLoopHorizontal,
}

impl LayoutKind {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "vertical" => Self::Vertical,
            "horizontal" => Self::Horizontal,
            "layered" => Self::Layered,
            "forLoopVertical" => Self::ForLoopVertical,
            "forLoopHorizontal" => Self::ForLoopHorizontal,
            _ => return None,
        })
    }

    pub fn is_loop(self) -> bool {
        matches!(self, Self::ForLoopVertical | Self::ForLoopHorizontal)
    }
}

/// Iteration parameters of a for-loop layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopBinding {
    /// Name the iteration index is bound to, read as `@@{name}`.
    pub index_name: String,
    /// Raw iteration count; may be a binding expression.
    pub count: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    #[serde(rename = "layoutType")]
    pub kind: LayoutKind,
    pub children: Vec<Component>,
    /// Color style code.
    pub background: Option<String>,
    /// Round style code.
    pub round: Option<String>,
    /// Padding style code.
    pub padding: Option<String>,
    pub loop_binding: Option<LoopBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Text,
    Button,
    Image,
    Input,
    Checkbox,
    Spacer,
    Divider,
}

impl WidgetKind {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "text" => Self::Text,
            "button" => Self::Button,
            "image" => Self::Image,
            "input" => Self::Input,
            "checkbox" => Self::Checkbox,
            "spacer" => Self::Spacer,
            "divider" => Self::Divider,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[serde(rename = "widgetType")]
    pub kind: WidgetKind,
    #[serde(default)]
    pub properties: Vec<WidgetProperty>,
    /// Action fired when the widget is activated.
    #[serde(default)]
    pub action: Option<UiAction>,
}

impl Widget {
    pub fn property(&self, code: &str) -> Option<&WidgetProperty> {
        self.properties.iter().find(|p| p.code == code)
    }

    /// The resolved value of `code` if resolution ran, else its raw literal.
    pub fn value(&self, code: &str) -> Option<&str> {
        self.property(code).map(WidgetProperty::effective)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetProperty {
    pub code: String,
    /// Literal as written in the markup.
    pub value: String,
    /// Filled in by resolution; `None` in a freshly parsed document.
    #[serde(default)]
    pub resolved: Option<String>,
}

impl WidgetProperty {
    pub fn new(code: impl Into<String>, value: impl Into<String>) -> Self {
        Self { code: code.into(), value: value.into(), resolved: None }
    }

    pub fn effective(&self) -> &str {
        self.resolved.as_deref().unwrap_or(&self.value)
    }
}

// ── Actions ───────────────────────────────────────────────────────────────

/// Declarative instruction produced by user interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiAction {
    OpenScreen { screen_code: String },
    Back,
    OpenBottomSheet,
    RefreshScreen { screen_code: String },
    RefreshWidget,
    RefreshLayout,
    OpenDeeplink { uri: String },
    ExecuteQuery { query_code: String },
    DataTransform { variable_name: String, new_value: String },
    SaveToContext { value_from: String, value_to: String },
    NativeCode { action_code: String, parameters: BTreeMap<String, String> },
    Empty,
}

impl UiAction {
    /// Markup/serialized discriminator of this variant.
    pub fn type_code(&self) -> &'static str {
        match self {
            UiAction::OpenScreen { .. } => "openScreen",
            UiAction::Back => "back",
            UiAction::OpenBottomSheet => "openBottomSheet",
            UiAction::RefreshScreen { .. } => "refreshScreen",
            UiAction::RefreshWidget => "refreshWidget",
            UiAction::RefreshLayout => "refreshLayout",
            UiAction::OpenDeeplink { .. } => "openDeeplink",
            UiAction::ExecuteQuery { .. } => "executeQuery",
            UiAction::DataTransform { .. } => "dataTransform",
            UiAction::SaveToContext { .. } => "saveToContext",
            UiAction::NativeCode { .. } => "nativeCode",
            UiAction::Empty => "empty",
        }
    }
}

// ── Queries ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub code: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub parameters: Vec<KeyValue>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Binds a [`Query`] to a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenQuery {
    pub screen_code: String,
    pub query_code: String,
    pub order: i32,
    #[serde(default)]
    pub parameters: Vec<KeyValue>,
    /// Context variable the query result is stored under.
    #[serde(default)]
    pub output: Option<String>,
}

// ── Styles ────────────────────────────────────────────────────────────────

/// Five independent code-keyed style tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSet {
    pub text: BTreeMap<String, TextStyle>,
    pub color: BTreeMap<String, ColorStyle>,
    pub align: BTreeMap<String, AlignStyle>,
    pub padding: BTreeMap<String, PaddingStyle>,
    pub round: BTreeMap<String, RoundStyle>,
}

impl StyleSet {
    pub fn len(&self) -> usize {
        self.text.len() + self.color.len() + self.align.len() + self.padding.len() + self.round.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub code: String,
    pub font_family: Option<String>,
    pub font_size: Option<i32>,
    pub font_weight: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColor {
    /// `#rrggbb` or `#aarrggbb`, validated at parse time.
    pub color: String,
    /// Percentage, 0..=100.
    pub opacity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStyle {
    pub code: String,
    pub light: ThemeColor,
    /// Falls back to `light` when absent.
    pub dark: Option<ThemeColor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignStyle {
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddingStyle {
    pub code: String,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStyle {
    pub code: String,
    pub radius: i32,
}
