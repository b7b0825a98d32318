//! Deserialization of the tagged unions ([`Component`], [`UiAction`]).
//!
//! New data always carries an explicit `"type"` discriminator. Objects
//! written without one are accepted through a compatibility shim: the
//! variant is sniffed from its required fields, in a fixed priority order,
//! and anything left over maps to the default variant (`Layout` for
//! components, `Empty` for actions, the only action variant without
//! required fields at the end of the order).

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::{Component, Layout, UiAction, Widget};

// ── Component ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TaggedComponent {
    Layout(Layout),
    Widget(Widget),
}

impl From<TaggedComponent> for Component {
    fn from(tagged: TaggedComponent) -> Self {
        match tagged {
            TaggedComponent::Layout(l) => Component::Layout(l),
            TaggedComponent::Widget(w) => Component::Widget(w),
        }
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        component_from_value(value).map_err(de::Error::custom)
    }
}

fn component_from_value(value: Value) -> Result<Component, serde_json::Error> {
    let Value::Object(map) = value else {
        return Err(de::Error::custom("component must be an object"));
    };
    if map.contains_key("type") {
        return serde_json::from_value::<TaggedComponent>(Value::Object(map)).map(Into::into);
    }
    if !map.contains_key("layoutType") && map.contains_key("widgetType") {
        log::debug!("component without discriminator sniffed as widget");
        return serde_json::from_value(Value::Object(map)).map(Component::Widget);
    }
    serde_json::from_value(Value::Object(map)).map(Component::Layout)
}

// ── UiAction ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum TaggedAction {
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
    NativeCode {
        action_code: String,
        #[serde(default)]
        parameters: std::collections::BTreeMap<String, String>,
    },
    Empty,
}

impl From<TaggedAction> for UiAction {
    fn from(tagged: TaggedAction) -> Self {
        match tagged {
            TaggedAction::OpenScreen { screen_code } => UiAction::OpenScreen { screen_code },
            TaggedAction::Back => UiAction::Back,
            TaggedAction::OpenBottomSheet => UiAction::OpenBottomSheet,
            TaggedAction::RefreshScreen { screen_code } => UiAction::RefreshScreen { screen_code },
            TaggedAction::RefreshWidget => UiAction::RefreshWidget,
            TaggedAction::RefreshLayout => UiAction::RefreshLayout,
            TaggedAction::OpenDeeplink { uri } => UiAction::OpenDeeplink { uri },
            TaggedAction::ExecuteQuery { query_code } => UiAction::ExecuteQuery { query_code },
            TaggedAction::DataTransform { variable_name, new_value } => {
                UiAction::DataTransform { variable_name, new_value }
            }
            TaggedAction::SaveToContext { value_from, value_to } => {
                UiAction::SaveToContext { value_from, value_to }
            }
            TaggedAction::NativeCode { action_code, parameters } => {
                UiAction::NativeCode { action_code, parameters }
            }
            TaggedAction::Empty => UiAction::Empty,
        }
    }
}

/// Sniff order for discriminator-less actions: required fields → variant tag.
/// `screenCode` alone is ambiguous between `openScreen` and `refreshScreen`;
/// the earlier entry wins.
const ACTION_SNIFF_ORDER: &[(&[&str], &str)] = &[
    (&["screenCode"], "openScreen"),
    (&["uri"], "openDeeplink"),
    (&["queryCode"], "executeQuery"),
    (&["variableName", "newValue"], "dataTransform"),
    (&["valueFrom", "valueTo"], "saveToContext"),
    (&["actionCode"], "nativeCode"),
];

impl<'de> Deserialize<'de> for UiAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        action_from_value(value).map_err(de::Error::custom)
    }
}

fn action_from_value(value: Value) -> Result<UiAction, serde_json::Error> {
    let Value::Object(mut map) = value else {
        return Err(de::Error::custom("action must be an object"));
    };
    if !map.contains_key("type") {
        let tag = sniff_action(&map);
        log::debug!("action without discriminator sniffed as {tag}");
        map.insert("type".to_string(), Value::String(tag.to_string()));
    }
    serde_json::from_value::<TaggedAction>(Value::Object(map)).map(Into::into)
}

fn sniff_action(map: &Map<String, Value>) -> &'static str {
    ACTION_SNIFF_ORDER
        .iter()
        .find(|(fields, _)| fields.iter().all(|f| map.contains_key(*f)))
        .map(|(_, tag)| *tag)
        .unwrap_or("empty")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::model::{LayoutKind, WidgetKind, WidgetProperty};

    fn action(v: Value) -> UiAction {
        serde_json::from_value(v).unwrap()
    }

    // ── tagged ────────────────────────────────────────────────────────────

    #[test]
    fn tagged_action_uses_discriminator() {
        let a = action(json!({"type": "refreshScreen", "screenCode": "home"}));
        assert_eq!(a, UiAction::RefreshScreen { screen_code: "home".into() });
    }

    #[test]
    fn serialized_action_carries_type_field() {
        let v = serde_json::to_value(UiAction::SaveToContext {
            value_from: "a".into(),
            value_to: "b".into(),
        })
        .unwrap();
        assert_eq!(v, json!({"type": "saveToContext", "valueFrom": "a", "valueTo": "b"}));
    }

    #[test]
    fn explicit_discriminator_beats_fields() {
        // A widget-shaped object explicitly tagged as a layout stays a layout.
        let c: Component = serde_json::from_value(json!({
            "type": "layout", "layoutType": "horizontal", "widgetType": "text"
        }))
        .unwrap();
        assert!(matches!(c, Component::Layout(Layout { kind: LayoutKind::Horizontal, .. })));
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        assert!(serde_json::from_value::<UiAction>(json!({"type": "launchRocket"})).is_err());
    }

    // ── sniffing ──────────────────────────────────────────────────────────

    #[test]
    fn untagged_screen_code_prefers_open_screen() {
        let a = action(json!({"screenCode": "x"}));
        assert_eq!(a, UiAction::OpenScreen { screen_code: "x".into() });
    }

    #[test]
    fn untagged_native_code() {
        let a = action(json!({"actionCode": "share", "parameters": {"k": "v"}}));
        let mut params = BTreeMap::new();
        params.insert("k".to_string(), "v".to_string());
        assert_eq!(a, UiAction::NativeCode { action_code: "share".into(), parameters: params });
    }

    #[test]
    fn untagged_save_needs_both_fields() {
        // Only half of saveToContext's fields: nothing matches, falls to empty.
        assert_eq!(action(json!({"valueFrom": "a"})), UiAction::Empty);
    }

    #[test]
    fn untagged_widget_sniffed_by_widget_type() {
        let c: Component = serde_json::from_value(json!({
            "widgetType": "text",
            "properties": [{"code": "text", "value": "hi"}]
        }))
        .unwrap();
        let Component::Widget(w) = c else { panic!("expected widget") };
        assert_eq!(w.kind, WidgetKind::Text);
        assert_eq!(w.properties, vec![WidgetProperty::new("text", "hi")]);
    }

    #[test]
    fn untagged_empty_object_defaults_to_layout() {
        let c: Component = serde_json::from_value(json!({})).unwrap();
        assert_eq!(c, Component::Layout(Layout::default()));
    }

    #[test]
    fn untagged_children_are_sniffed_recursively() {
        let c: Component = serde_json::from_value(json!({
            "layoutType": "vertical",
            "children": [{"widgetType": "divider"}, {"layoutType": "layered"}]
        }))
        .unwrap();
        assert_eq!(c.node_count(), 3);
    }
}
