use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::model::{
    Component, Layout, LayoutKind, LoopBinding, ScreenDefinition, UiAction, Widget, WidgetKind,
    WidgetProperty,
};

use super::queries::params;
use super::reader::{Element, TagReader};

/// Attributes of a `<widget>` that are not turned into properties.
const WIDGET_RESERVED: &[&str] = &["kind", "widgetType"];

/// Parse one screen file.
///
/// Returns `Ok(None)` for blank input and for files whose root is not a
/// `<screen>`: such files are skipped, not reported.
pub(crate) fn parse_screen(src: &str) -> Result<Option<ScreenDefinition>, ParseError> {
    let mut reader = TagReader::new(src);
    let Some(el) = reader.root()? else {
        return Ok(None);
    };
    if el.name != "screen" {
        log::debug!("skipping screen file with root <{}>", el.name);
        return Ok(None);
    }

    let code = el.required("code")?.to_string();
    let title = el.attr("title").unwrap_or_default().to_string();
    let deeplink = el.attr("deeplink").map(str::to_string);

    let mut root = None;
    reader.for_each_child(&el, |r, child| {
        if !is_component_tag(&child.name) {
            return Err(el.unexpected(&child));
        }
        if root.is_some() {
            return Err(el.duplicate(&child));
        }
        root = Some(component(r, child)?);
        Ok(())
    })?;
    reader.finish()?;

    Ok(Some(ScreenDefinition { code, title, deeplink, root, queries: Vec::new() }))
}

fn is_component_tag(name: &str) -> bool {
    matches!(name, "layout" | "widget" | "component")
}

// ── Component ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentClass {
    Layout,
    Widget,
}

/// Decide layout vs. widget for a component tag.
///
/// The tag name (`<layout>`/`<widget>`) or an explicit `kind` attribute on a
/// `<component>` always wins. Without one, a `layoutType` attribute marks a
/// layout and a `widgetType` attribute a widget; anything else is treated as
/// a layout.
fn classify(el: &Element) -> Result<ComponentClass, ParseError> {
    match el.name.as_str() {
        "layout" => return Ok(ComponentClass::Layout),
        "widget" => return Ok(ComponentClass::Widget),
        _ => {}
    }
    match el.attr("kind") {
        Some("layout") => Ok(ComponentClass::Layout),
        Some("widget") => Ok(ComponentClass::Widget),
        Some(other) => Err(el.invalid("kind", other, "expected `layout` or `widget`")),
        None if el.has("layoutType") => Ok(ComponentClass::Layout),
        None if el.has("widgetType") => Ok(ComponentClass::Widget),
        None => {
            log::warn!("<{}> on line {} has no discriminator; treating it as a layout", el.name, el.line());
            Ok(ComponentClass::Layout)
        }
    }
}

fn component(r: &mut TagReader<'_>, el: Element) -> Result<Component, ParseError> {
    match classify(&el)? {
        ComponentClass::Layout => layout(r, &el).map(Component::Layout),
        ComponentClass::Widget => widget(r, &el).map(Component::Widget),
    }
}

// ── Layout ────────────────────────────────────────────────────────────────

fn layout(r: &mut TagReader<'_>, el: &Element) -> Result<Layout, ParseError> {
    let kind = match el.attr("layoutType") {
        None => LayoutKind::Vertical,
        Some(code) => LayoutKind::from_code(code)
            .ok_or_else(|| el.invalid("layoutType", code, "unknown layout type"))?,
    };

    let loop_binding = if kind.is_loop() {
        Some(LoopBinding {
            index_name: el.attr("indexName").unwrap_or("index").to_string(),
            count: el.required("count")?.to_string(),
        })
    } else {
        None
    };

    let mut children = Vec::new();
    r.for_each_child(el, |r, child| {
        if !is_component_tag(&child.name) {
            return Err(el.unexpected(&child));
        }
        children.push(component(r, child)?);
        Ok(())
    })?;

    Ok(Layout {
        kind,
        children,
        background: el.attr("background").map(str::to_string),
        round: el.attr("round").map(str::to_string),
        padding: el.attr("padding").map(str::to_string),
        loop_binding,
    })
}

// ── Widget ────────────────────────────────────────────────────────────────

fn widget(r: &mut TagReader<'_>, el: &Element) -> Result<Widget, ParseError> {
    let type_code = el.required("widgetType")?;
    let kind = WidgetKind::from_code(type_code)
        .ok_or_else(|| el.invalid("widgetType", type_code, "unknown widget type"))?;

    // Shorthand attributes first, then explicit <property> children.
    let mut properties: Vec<WidgetProperty> = el
        .attributes()
        .filter(|(key, _)| !WIDGET_RESERVED.contains(key))
        .map(|(key, value)| WidgetProperty::new(key, value))
        .collect();
    let mut action = None;

    r.for_each_child(el, |r, child| {
        match child.name.as_str() {
            "property" => {
                properties.push(WidgetProperty::new(
                    child.required("code")?,
                    child.attr("value").unwrap_or_default(),
                ));
                r.leaf(&child)?;
            }
            "action" => {
                if action.is_some() {
                    return Err(el.duplicate(&child));
                }
                action = Some(parse_action(r, &child)?);
            }
            _ => return Err(el.unexpected(&child)),
        }
        Ok(())
    })?;

    Ok(Widget { kind, properties, action })
}

// ── Action ────────────────────────────────────────────────────────────────

/// Parse an `<action type="...">` element.
pub(crate) fn parse_action(r: &mut TagReader<'_>, el: &Element) -> Result<UiAction, ParseError> {
    let owned = |key: &str| el.required(key).map(str::to_string);

    let type_code = el.required("type")?;
    let action = match type_code {
        "openScreen" => UiAction::OpenScreen { screen_code: owned("screenCode")? },
        "back" => UiAction::Back,
        "openBottomSheet" => UiAction::OpenBottomSheet,
        "refreshScreen" => UiAction::RefreshScreen { screen_code: owned("screenCode")? },
        "refreshWidget" => UiAction::RefreshWidget,
        "refreshLayout" => UiAction::RefreshLayout,
        "openDeeplink" => UiAction::OpenDeeplink { uri: owned("uri")? },
        "executeQuery" => UiAction::ExecuteQuery { query_code: owned("queryCode")? },
        "dataTransform" => UiAction::DataTransform {
            variable_name: owned("variableName")?,
            new_value: el.attr("newValue").unwrap_or_default().to_string(),
        },
        "saveToContext" => UiAction::SaveToContext {
            value_from: owned("valueFrom")?,
            value_to: owned("valueTo")?,
        },
        "nativeCode" => {
            let action_code = owned("actionCode")?;
            let parameters: BTreeMap<String, String> =
                params(r, el)?.into_iter().map(|kv| (kv.key, kv.value)).collect();
            return Ok(UiAction::NativeCode { action_code, parameters });
        }
        "empty" => UiAction::Empty,
        other => return Err(el.invalid("type", other, "unknown action type")),
    };
    r.leaf(el)?;
    Ok(action)
}
