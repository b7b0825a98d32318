//! Component tree resolution.
//!
//! [`resolve_component`] produces a copy of a parsed tree in which every
//! binding has been evaluated against a [`ResolutionContext`]. The parsed
//! tree is left untouched.
//!
//! For-loop layouts are unrolled: the resolved copy is a plain vertical or
//! horizontal layout holding `count` copies of the loop body, each resolved
//! with the loop index bound in frame-local data.

use nabu_markup::{Component, Layout, LayoutKind, Widget, WidgetProperty};

use crate::context::ResolutionContext;
use crate::expr::resolve_value_expression;

/// Upper bound on the iterations of a single for-loop layout.
pub const MAX_LOOP_ITERATIONS: usize = 10_000;

pub fn resolve_component(component: &Component, ctx: &ResolutionContext) -> Component {
    match component {
        Component::Layout(layout) => Component::Layout(resolve_layout(layout, ctx)),
        Component::Widget(widget) => Component::Widget(resolve_widget(widget, ctx)),
    }
}

fn resolve_widget(widget: &Widget, ctx: &ResolutionContext) -> Widget {
    let properties = widget
        .properties
        .iter()
        .map(|p| WidgetProperty {
            code: p.code.clone(),
            value: p.value.clone(),
            resolved: Some(resolve_value_expression(&p.value, ctx)),
        })
        .collect();
    Widget { kind: widget.kind, properties, action: widget.action.clone() }
}

fn resolve_layout(layout: &Layout, ctx: &ResolutionContext) -> Layout {
    let resolve_code = |code: &Option<String>| code.as_deref().map(|c| resolve_value_expression(c, ctx));

    let mut out = Layout {
        kind: layout.kind,
        children: Vec::new(),
        background: resolve_code(&layout.background),
        round: resolve_code(&layout.round),
        padding: resolve_code(&layout.padding),
        loop_binding: None,
    };

    let binding = match (&layout.loop_binding, layout.kind.is_loop()) {
        (Some(binding), true) => binding,
        _ => {
            out.loop_binding = layout.loop_binding.clone();
            out.children = layout.children.iter().map(|c| resolve_component(c, ctx)).collect();
            return out;
        }
    };

    out.kind = match layout.kind {
        LayoutKind::ForLoopHorizontal => LayoutKind::Horizontal,
        _ => LayoutKind::Vertical,
    };

    let count = iteration_count(&resolve_value_expression(&binding.count, ctx));
    let mut scope = ctx.clone();
    out.children.reserve(count * layout.children.len());
    for index in 0..count {
        scope.bind_local(&binding.index_name, index as i64);
        out.children.extend(layout.children.iter().map(|c| resolve_component(c, &scope)));
    }
    out
}

/// Non-numeric, negative or non-finite counts give no iterations.
fn iteration_count(resolved: &str) -> usize {
    let Ok(n) = resolved.trim().parse::<f64>() else {
        log::debug!("loop count {resolved:?} is not a number; rendering no rows");
        return 0;
    };
    if !n.is_finite() || n <= 0.0 {
        return 0;
    }
    let n = n as usize;
    if n > MAX_LOOP_ITERATIONS {
        log::warn!("loop count {n} capped at {MAX_LOOP_ITERATIONS}");
        return MAX_LOOP_ITERATIONS;
    }
    n
}

#[cfg(test)]
mod tests {
    use nabu_markup::{LoopBinding, UiAction, WidgetKind};

    use super::*;

    fn text(value: &str) -> Component {
        Component::Widget(Widget {
            kind: WidgetKind::Text,
            properties: vec![WidgetProperty::new("text", value)],
            action: None,
        })
    }

    fn texts(tree: &Component) -> Vec<String> {
        match tree {
            Component::Widget(w) => vec![w.value("text").unwrap_or_default().to_string()],
            Component::Layout(l) => l.children.iter().flat_map(texts).collect(),
        }
    }

    fn rows(count: &str, body: Vec<Component>) -> Component {
        Component::Layout(Layout {
            kind: LayoutKind::ForLoopVertical,
            children: body,
            loop_binding: Some(LoopBinding { index_name: "i".into(), count: count.into() }),
            ..Layout::default()
        })
    }

    // ── widgets ───────────────────────────────────────────────────────────

    #[test]
    fn widget_properties_get_resolved_values() {
        let ctx = ResolutionContext::new().with_microapp("shop", "title", "Store");
        let Component::Widget(w) = resolve_component(&text("@{shop.title}"), &ctx) else {
            panic!("expected widget")
        };
        assert_eq!(w.properties[0].value, "@{shop.title}");
        assert_eq!(w.properties[0].resolved.as_deref(), Some("Store"));
    }

    #[test]
    fn action_is_carried_over() {
        let mut w = Widget { kind: WidgetKind::Button, properties: Vec::new(), action: Some(UiAction::Back) };
        w.properties.push(WidgetProperty::new("text", "Back"));
        let Component::Widget(out) = resolve_component(&Component::Widget(w), &ResolutionContext::new()) else {
            panic!("expected widget")
        };
        assert_eq!(out.action, Some(UiAction::Back));
    }

    #[test]
    fn source_tree_is_untouched() {
        let tree = text("@{shop.title}");
        let _ = resolve_component(&tree, &ResolutionContext::new().with_microapp("shop", "title", "x"));
        let Component::Widget(w) = &tree else { unreachable!() };
        assert!(w.properties[0].resolved.is_none());
    }

    // ── layouts ───────────────────────────────────────────────────────────

    #[test]
    fn style_codes_are_resolved() {
        let layout = Component::Layout(Layout {
            background: Some("*if(@@{dark} == true)*then(night)*else(day)".into()),
            ..Layout::default()
        });
        let ctx = ResolutionContext::new().with_engine("dark", true);
        let Component::Layout(l) = resolve_component(&layout, &ctx) else { panic!("expected layout") };
        assert_eq!(l.background.as_deref(), Some("night"));
    }

    #[test]
    fn loop_expands_with_index() {
        let tree = rows("@{shop.count}", vec![text("Row @@{i}")]);
        let ctx = ResolutionContext::new().with_microapp("shop", "count", 3i64);
        let out = resolve_component(&tree, &ctx);
        assert_eq!(texts(&out), ["Row 0", "Row 1", "Row 2"]);

        let Component::Layout(l) = out else { panic!("expected layout") };
        assert_eq!(l.kind, LayoutKind::Vertical);
        assert!(l.loop_binding.is_none());
    }

    #[test]
    fn loop_body_with_several_children() {
        let tree = rows("2", vec![text("a@@{i}"), text("b@@{i}")]);
        assert_eq!(texts(&resolve_component(&tree, &ResolutionContext::new())), ["a0", "b0", "a1", "b1"]);
    }

    #[test]
    fn nested_loops_see_both_indexes() {
        let inner = Component::Layout(Layout {
            kind: LayoutKind::ForLoopHorizontal,
            children: vec![text("@@{i}.@@{j}")],
            loop_binding: Some(LoopBinding { index_name: "j".into(), count: "2".into() }),
            ..Layout::default()
        });
        let tree = rows("2", vec![inner]);
        assert_eq!(texts(&resolve_component(&tree, &ResolutionContext::new())), ["0.0", "0.1", "1.0", "1.1"]);
    }

    #[test]
    fn non_numeric_count_gives_no_rows() {
        let tree = rows("@{shop.missing}", vec![text("x")]);
        assert!(texts(&resolve_component(&tree, &ResolutionContext::new())).is_empty());
    }

    #[test]
    fn iteration_counts() {
        assert_eq!(iteration_count("3"), 3);
        assert_eq!(iteration_count(" 2.0 "), 2);
        assert_eq!(iteration_count("-1"), 0);
        assert_eq!(iteration_count("inf"), 0);
        assert_eq!(iteration_count("1e9"), MAX_LOOP_ITERATIONS);
    }
}
