//! Markup → [`Document`].
//!
//! Every section (microapp header, styles, queries, each screen file) is
//! parsed on its own. A section that fails contributes an empty result and a
//! [`SectionError`] to the [`ParseReport`]; the remaining sections are parsed
//! regardless, so one broken screen never blocks the rest of the microapp.

mod microapp;
mod queries;
mod reader;
mod screen;
mod styles;

use std::fmt;

use crate::error::ParseError;
use crate::model::{Document, ScreenDefinition};

// ── Report ────────────────────────────────────────────────────────────────

/// Identifies the markup section a [`SectionError`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Microapp,
    Styles,
    Queries,
    /// A screen file, by the name the host supplied it under.
    Screen(String),
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Microapp => f.write_str("microapp"),
            Section::Styles => f.write_str("styles"),
            Section::Queries => f.write_str("queries"),
            Section::Screen(name) => write!(f, "screen `{name}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionError {
    pub section: Section,
    pub error: ParseError,
}

/// Sections that were dropped while building a [`Document`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub errors: Vec<SectionError>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record<T: Default>(&mut self, section: Section, result: Result<T, ParseError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                log::warn!("dropping {section}: {error}");
                self.errors.push(SectionError { section, error });
                T::default()
            }
        }
    }
}

// ── Entry points ──────────────────────────────────────────────────────────

/// Parse all sections of a microapp into a [`Document`].
///
/// Never fails; see [`parse_with_report`] for the list of dropped sections.
pub fn parse(microapp: &str, styles: &str, queries: &str, screens: &[(String, String)]) -> Document {
    parse_with_report(microapp, styles, queries, screens).0
}

/// Like [`parse`], also returning which sections failed and why.
pub fn parse_with_report(
    microapp: &str,
    styles: &str,
    queries: &str,
    screens: &[(String, String)],
) -> (Document, ParseReport) {
    let mut report = ParseReport::default();

    let microapp = report.record(Section::Microapp, microapp::parse_microapp(microapp));
    let styles = report.record(Section::Styles, styles::parse_styles(styles));
    let query_block = report.record(Section::Queries, queries::parse_queries(queries));

    let mut parsed: Vec<ScreenDefinition> = Vec::with_capacity(screens.len());
    for (name, src) in screens {
        let screen = report.record(Section::Screen(name.clone()), screen::parse_screen(src));
        let Some(screen) = screen else { continue };
        if parsed.iter().any(|s| s.code == screen.code) {
            log::warn!("screen code {:?} from `{name}` already defined; ignoring", screen.code);
            continue;
        }
        parsed.push(screen);
    }

    for screen in &mut parsed {
        screen.queries = query_block
            .screen_queries
            .iter()
            .filter(|sq| sq.screen_code == screen.code)
            .cloned()
            .collect();
        screen.queries.sort_by_key(|sq| sq.order);
    }

    log::debug!(
        "parsed {} screens, {} queries, {} styles; {} sections dropped",
        parsed.len(),
        query_block.queries.len(),
        styles.len(),
        report.errors.len()
    );

    let document = Document {
        microapp,
        screens: parsed,
        queries: query_block.queries,
        screen_queries: query_block.screen_queries,
        styles,
    };
    (document, report)
}
