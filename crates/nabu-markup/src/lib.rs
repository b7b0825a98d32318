//! Document model and markup parser for **Nabu** microapps.
//!
//! This crate has no engine dependencies, so hosts and tooling can parse and
//! inspect a microapp without pulling in the runtime.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`model`] | `Document`, `ScreenDefinition`, `Component`, `UiAction`, `StyleSet`, queries |
//! | [`parser`] | `parse` / `parse_with_report`, per-section error reporting |
//! | [`bundle`] | `MarkupBundle`: read a microapp directory from disk |
//! | [`error`] | `ParseError`, `BundleError` |
//!
//! # Quick start
//!
//! ```rust
//! use nabu_markup::parse;
//!
//! let screens = vec![(
//!     "home.xml".to_string(),
//!     r#"<screen code="home" title="Home">
//!          <layout layoutType="vertical">
//!            <widget widgetType="text" text="Hello @{shop.user}"/>
//!          </layout>
//!        </screen>"#
//!         .to_string(),
//! )];
//!
//! let doc = parse(r#"<microapp title="Shop" code="shop"/>"#, "", "", &screens);
//! assert_eq!(doc.screens[0].code, "home");
//! ```

pub mod bundle;
mod codec;
pub mod error;
pub mod model;
pub mod parser;

pub use bundle::MarkupBundle;
pub use error::{BundleError, ParseError, ParseErrorKind};
pub use model::{
    AlignStyle, ColorStyle, Component, Document, KeyValue, Layout, LayoutKind, LoopBinding,
    Microapp, PaddingStyle, Query, RoundStyle, ScreenDefinition, ScreenQuery, StyleSet, TextStyle,
    ThemeColor, UiAction, Widget, WidgetKind, WidgetProperty,
};
pub use parser::{ParseReport, Section, SectionError, parse, parse_with_report};
