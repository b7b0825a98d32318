//! Style lookup.
//!
//! [`StyleRegistry`] answers "what does style code `x` mean" for the five
//! style kinds of a microapp. Components refer to styles by code; a code
//! that is not registered is not an error, the affected fields simply keep
//! their [`ResolvedStyles::default`] values.

use std::fmt;

use nabu_markup::{AlignStyle, ColorStyle, Layout, PaddingStyle, RoundStyle, StyleSet, TextStyle, ThemeColor, Widget};

/// Default font size, in points, when no text style applies.
pub const DEFAULT_FONT_SIZE: i32 = 14;
/// Default font weight when no text style applies.
pub const DEFAULT_FONT_WEIGHT: i32 = 400;

// ── ThemeMode ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

// ── Rgba ──────────────────────────────────────────────────────────────────

/// Straight-alpha 8-bit color.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#aarrggbb` and scale alpha by `opacity` percent.
    ///
    /// `opacity` is clamped to `0..=100`.
    pub fn from_hex(hex: &str, opacity: i32) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        let (a, rgb) = match digits.len() {
            6 => (0xff, value),
            8 => ((value >> 24) as u8, value & 0x00ff_ffff),
            _ => return None,
        };
        let opacity = opacity.clamp(0, 100) as u32;
        let a = ((a as u32 * opacity + 50) / 100) as u8;
        Some(Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, a))
    }

    fn from_theme(theme: &ThemeColor) -> Option<Self> {
        Self::from_hex(&theme.color, theme.opacity)
    }
}

/// `#aarrggbb`, the same layout the markup accepts.
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }
}

// ── ResolvedStyles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl From<&PaddingStyle> for Insets {
    fn from(p: &PaddingStyle) -> Self {
        Self { left: p.left, top: p.top, right: p.right, bottom: p.bottom }
    }
}

/// Concrete style values for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStyles {
    pub font_family: Option<String>,
    pub font_size: i32,
    pub font_weight: i32,
    pub foreground: Option<Rgba>,
    pub background: Option<Rgba>,
    /// Alignment style code; the renderer interprets it.
    pub align: Option<String>,
    pub padding: Insets,
    pub corner_radius: i32,
}

impl Default for ResolvedStyles {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: DEFAULT_FONT_WEIGHT,
            foreground: None,
            background: None,
            align: None,
            padding: Insets::default(),
            corner_radius: 0,
        }
    }
}

impl ResolvedStyles {
    fn apply_text(&mut self, style: &TextStyle) {
        if style.font_family.is_some() {
            self.font_family.clone_from(&style.font_family);
        }
        self.font_size = style.font_size.unwrap_or(self.font_size);
        self.font_weight = style.font_weight.unwrap_or(self.font_weight);
    }
}

// ── StyleRegistry ─────────────────────────────────────────────────────────

/// Code-keyed style tables of one microapp.
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    styles: StyleSet,
}

impl StyleRegistry {
    pub fn new(styles: StyleSet) -> Self {
        Self { styles }
    }

    pub fn text(&self, code: &str) -> Option<&TextStyle> {
        self.styles.text.get(code)
    }

    pub fn color_style(&self, code: &str) -> Option<&ColorStyle> {
        self.styles.color.get(code)
    }

    pub fn align(&self, code: &str) -> Option<&AlignStyle> {
        self.styles.align.get(code)
    }

    pub fn padding(&self, code: &str) -> Option<&PaddingStyle> {
        self.styles.padding.get(code)
    }

    pub fn round(&self, code: &str) -> Option<&RoundStyle> {
        self.styles.round.get(code)
    }

    /// Color of style `code` in `theme`. Dark falls back to light.
    pub fn color(&self, code: &str, theme: ThemeMode) -> Option<Rgba> {
        let style = self.color_style(code)?;
        let theme_color = match theme {
            ThemeMode::Light => &style.light,
            ThemeMode::Dark => style.dark.as_ref().unwrap_or(&style.light),
        };
        let rgba = Rgba::from_theme(theme_color);
        if rgba.is_none() {
            log::warn!("color style `{code}` has unreadable color {:?}", theme_color.color);
        }
        rgba
    }

    /// Styles referenced by a widget's `textStyle`, `color`, `background`,
    /// `align`, `padding` and `round` properties.
    pub fn widget_styles(&self, widget: &Widget, theme: ThemeMode) -> ResolvedStyles {
        let mut out = ResolvedStyles::default();
        if let Some(style) = widget.value("textStyle").and_then(|c| self.text(c)) {
            out.apply_text(style);
        }
        out.foreground = widget.value("color").and_then(|c| self.color(c, theme));
        out.background = widget.value("background").and_then(|c| self.color(c, theme));
        out.align = widget.value("align").and_then(|c| self.align(c)).map(|s| s.code.clone());
        if let Some(p) = widget.value("padding").and_then(|c| self.padding(c)) {
            out.padding = p.into();
        }
        if let Some(r) = widget.value("round").and_then(|c| self.round(c)) {
            out.corner_radius = r.radius;
        }
        out
    }

    /// Styles referenced by a layout's `background`, `padding` and `round`.
    pub fn layout_styles(&self, layout: &Layout, theme: ThemeMode) -> ResolvedStyles {
        let mut out = ResolvedStyles::default();
        out.background = layout.background.as_deref().and_then(|c| self.color(c, theme));
        if let Some(p) = layout.padding.as_deref().and_then(|c| self.padding(c)) {
            out.padding = p.into();
        }
        if let Some(r) = layout.round.as_deref().and_then(|c| self.round(c)) {
            out.corner_radius = r.radius;
        }
        out
    }
}
