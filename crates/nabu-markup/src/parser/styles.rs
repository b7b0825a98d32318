use std::collections::BTreeMap;

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{AlignStyle, ColorStyle, PaddingStyle, RoundStyle, StyleSet, TextStyle, ThemeColor};

use super::reader::{Element, TagReader};

/// Parse a `<styles>` block. Blank input yields an empty set.
pub(crate) fn parse_styles(src: &str) -> Result<StyleSet, ParseError> {
    let mut reader = TagReader::new(src);
    let Some(root) = reader.expect_root("styles")? else {
        return Ok(StyleSet::default());
    };

    let mut set = StyleSet::default();
    reader.for_each_child(&root, |r, el| match el.name.as_str() {
        "textStyle" => insert(&mut set.text, text_style(r, &el)?, |s| &s.code),
        "colorStyle" => insert(&mut set.color, color_style(r, &el)?, |s| &s.code),
        "alignStyle" => insert(&mut set.align, align_style(r, &el)?, |s| &s.code),
        "paddingStyle" => insert(&mut set.padding, padding_style(r, &el)?, |s| &s.code),
        "roundStyle" => insert(&mut set.round, round_style(r, &el)?, |s| &s.code),
        _ => Err(root.unexpected(&el)),
    })?;
    reader.finish()?;
    Ok(set)
}

fn insert<S>(table: &mut BTreeMap<String, S>, style: S, code: impl Fn(&S) -> &String) -> Result<(), ParseError> {
    let key = code(&style).clone();
    if table.insert(key.clone(), style).is_some() {
        log::warn!("style code {key:?} defined twice; keeping the last definition");
    }
    Ok(())
}

// ── textStyle ─────────────────────────────────────────────────────────────

fn text_style(r: &mut TagReader<'_>, el: &Element) -> Result<TextStyle, ParseError> {
    let style = TextStyle {
        code: el.required("code")?.to_string(),
        font_family: el.attr("fontFamily").map(str::to_string),
        font_size: el.int("fontSize")?,
        font_weight: el.int("fontWeight")?,
    };
    r.leaf(el)?;
    Ok(style)
}

// ── colorStyle ────────────────────────────────────────────────────────────

fn color_style(r: &mut TagReader<'_>, el: &Element) -> Result<ColorStyle, ParseError> {
    let code = el.required("code")?.to_string();
    let mut light = None;
    let mut dark = None;

    r.for_each_child(el, |r, child| {
        let slot = match child.name.as_str() {
            "lightTheme" => &mut light,
            "darkTheme" => &mut dark,
            _ => return Err(el.unexpected(&child)),
        };
        if slot.is_some() {
            return Err(el.duplicate(&child));
        }
        *slot = Some(theme_color(r, &child)?);
        Ok(())
    })?;

    let light = light.ok_or_else(|| {
        el.error(ParseErrorKind::MissingElement {
            element: "lightTheme".into(),
            parent: el.name.clone(),
        })
    })?;
    Ok(ColorStyle { code, light, dark })
}

fn theme_color(r: &mut TagReader<'_>, el: &Element) -> Result<ThemeColor, ParseError> {
    let color = el.required("color")?;
    if !is_hex_color(color) {
        return Err(el.invalid("color", color, "expected #rrggbb or #aarrggbb"));
    }
    let opacity = el.int_or("opacity", 100)?;
    if !(0..=100).contains(&opacity) {
        return Err(el.invalid("opacity", &opacity.to_string(), "expected a percentage in 0..=100"));
    }
    let theme = ThemeColor { color: color.to_string(), opacity };
    r.leaf(el)?;
    Ok(theme)
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// ── alignStyle / paddingStyle / roundStyle ────────────────────────────────

fn align_style(r: &mut TagReader<'_>, el: &Element) -> Result<AlignStyle, ParseError> {
    let style = AlignStyle { code: el.required("code")?.to_string() };
    r.leaf(el)?;
    Ok(style)
}

fn padding_style(r: &mut TagReader<'_>, el: &Element) -> Result<PaddingStyle, ParseError> {
    let style = PaddingStyle {
        code: el.required("code")?.to_string(),
        left: el.int_or("paddingLeft", 0)?,
        top: el.int_or("paddingTop", 0)?,
        right: el.int_or("paddingRight", 0)?,
        bottom: el.int_or("paddingBottom", 0)?,
    };
    r.leaf(el)?;
    Ok(style)
}

fn round_style(r: &mut TagReader<'_>, el: &Element) -> Result<RoundStyle, ParseError> {
    let style = RoundStyle {
        code: el.required("code")?.to_string(),
        radius: el.int_or("radiusValue", 0)?,
    };
    r.leaf(el)?;
    Ok(style)
}
