//! Streaming tag walk over `quick_xml` events.
//!
//! Sub-parsers never see a generic tree: they pull start markers one at a
//! time and descend into children with [`TagReader::for_each_child`], which
//! returns once the matching end marker has been consumed.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ParseError, ParseErrorKind};

// ── Element ───────────────────────────────────────────────────────────────

/// A start marker with its attributes decoded and unescaped.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    /// `<tag/>`: no children and no end marker follow.
    pub empty: bool,
    line: usize,
    col: usize,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn has(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    /// Attributes in source order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn required(&self, key: &str) -> Result<&str, ParseError> {
        self.attr(key).ok_or_else(|| {
            self.error(ParseErrorKind::MissingAttribute {
                element: self.name.clone(),
                attribute: key.to_string(),
            })
        })
    }

    pub fn int(&self, key: &str) -> Result<Option<i32>, ParseError> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| self.invalid(key, raw, "expected an integer")),
        }
    }

    pub fn int_or(&self, key: &str, default: i32) -> Result<i32, ParseError> {
        Ok(self.int(key)?.unwrap_or(default))
    }

    pub fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ParseError {
        self.error(ParseErrorKind::InvalidValue {
            element: self.name.clone(),
            attribute: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        })
    }

    /// Error for a child this element does not accept.
    pub fn unexpected(&self, child: &Element) -> ParseError {
        child.error(ParseErrorKind::UnexpectedElement {
            found: child.name.clone(),
            parent: self.name.clone(),
        })
    }

    pub fn duplicate(&self, child: &Element) -> ParseError {
        child.error(ParseErrorKind::DuplicateElement {
            found: child.name.clone(),
            parent: self.name.clone(),
        })
    }

    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.col)
    }
}

// ── Marker ────────────────────────────────────────────────────────────────

pub(crate) enum Marker {
    Start(Element),
    End,
    Eof,
}

// ── TagReader ─────────────────────────────────────────────────────────────

pub(crate) struct TagReader<'s> {
    src: &'s str,
    reader: Reader<&'s [u8]>,
    // Incremental line/col tracking so positions stay O(n) over the source.
    scanned: usize,
    line: usize,
    col: usize,
}

impl<'s> TagReader<'s> {
    pub fn new(src: &'s str) -> Self {
        let mut reader = Reader::from_str(src);
        reader.config_mut().trim_text(true);
        Self { src, reader, scanned: 0, line: 1, col: 1 }
    }

    fn position_of(&mut self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.src.len());
        if offset > self.scanned {
            for ch in self.src[self.scanned..offset].chars() {
                if ch == '\n' {
                    self.line += 1;
                    self.col = 1;
                } else {
                    self.col += 1;
                }
            }
            self.scanned = offset;
        }
        (self.line, self.col)
    }

    fn error_at(&mut self, offset: usize, kind: ParseErrorKind) -> ParseError {
        let (line, col) = self.position_of(offset);
        ParseError::new(kind, line, col)
    }

    pub fn next_marker(&mut self) -> Result<Marker, ParseError> {
        loop {
            let offset = self.reader.buffer_position() as usize;
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let at = self.reader.error_position() as usize;
                    return Err(self.error_at(at, ParseErrorKind::Malformed(e.to_string())));
                }
            };
            match event {
                Event::Start(start) => {
                    let at = self.tag_start();
                    return self.element(&start, false, at).map(Marker::Start);
                }
                Event::Empty(start) => {
                    let at = self.tag_start();
                    return self.element(&start, true, at).map(Marker::Start);
                }
                Event::End(_) => return Ok(Marker::End),
                Event::Eof => return Ok(Marker::Eof),
                Event::Text(text) => {
                    let text = String::from_utf8_lossy(&text).trim().to_string();
                    if !text.is_empty() {
                        return Err(self.error_at(offset, ParseErrorKind::UnexpectedText(text)));
                    }
                }
                Event::GeneralRef(entity) => {
                    let text = format!("&{};", String::from_utf8_lossy(&entity));
                    return Err(self.error_at(offset, ParseErrorKind::UnexpectedText(text)));
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    return Err(self.error_at(offset, ParseErrorKind::UnexpectedText(text)));
                }
                // Declarations, comments, processing instructions, doctypes.
                _ => continue,
            }
        }
    }

    /// Offset of the `<` that opened the tag just read.
    fn tag_start(&self) -> usize {
        let end = (self.reader.buffer_position() as usize).min(self.src.len());
        self.src[..end].rfind('<').unwrap_or(0)
    }

    fn element(
        &mut self,
        start: &BytesStart<'_>,
        empty: bool,
        offset: usize,
    ) -> Result<Element, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr
                .map_err(|e| self.error_at(offset, ParseErrorKind::Malformed(e.to_string())))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = std::str::from_utf8(&attr.value).map_err(|e| {
                self.error_at(offset, ParseErrorKind::Malformed(e.to_string()))
            })?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| self.error_at(offset, ParseErrorKind::Malformed(e.to_string())))?
                .into_owned();
            attrs.push((key, value));
        }
        let (line, col) = self.position_of(offset);
        Ok(Element { name, attrs, empty, line, col })
    }

    /// The first element of the document, or `None` for blank input.
    pub fn root(&mut self) -> Result<Option<Element>, ParseError> {
        match self.next_marker()? {
            Marker::Start(el) => Ok(Some(el)),
            Marker::Eof => Ok(None),
            Marker::End => {
                let at = self.reader.buffer_position() as usize;
                Err(self.error_at(at, ParseErrorKind::Malformed("unbalanced end tag".into())))
            }
        }
    }

    /// The root element, which must be named `expected`.
    pub fn expect_root(&mut self, expected: &str) -> Result<Option<Element>, ParseError> {
        match self.root()? {
            Some(el) if el.name != expected => Err(el.error(ParseErrorKind::UnexpectedRoot {
                expected: expected.to_string(),
                found: el.name.clone(),
            })),
            other => Ok(other),
        }
    }

    /// Visit every direct child of `parent` in document order, consuming
    /// `parent`'s end marker. Each visitor must fully consume its child.
    pub fn for_each_child<F>(&mut self, parent: &Element, mut visit: F) -> Result<(), ParseError>
    where
        F: FnMut(&mut Self, Element) -> Result<(), ParseError>,
    {
        if parent.empty {
            return Ok(());
        }
        loop {
            match self.next_marker()? {
                Marker::Start(child) => visit(self, child)?,
                // quick-xml has already checked that the end name matches.
                Marker::End => return Ok(()),
                Marker::Eof => return Err(parent.error(ParseErrorKind::UnexpectedEof)),
            }
        }
    }

    /// Consume an element that accepts no children.
    pub fn leaf(&mut self, el: &Element) -> Result<(), ParseError> {
        self.for_each_child(el, |_, child| Err(el.unexpected(&child)))
    }

    /// Ensure nothing but trailing whitespace/comments follows the root.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        match self.next_marker()? {
            Marker::Eof => Ok(()),
            Marker::Start(el) => Err(el.error(ParseErrorKind::Malformed(format!(
                "unexpected <{}> after the root element",
                el.name
            )))),
            Marker::End => {
                let at = self.reader.buffer_position() as usize;
                Err(self.error_at(at, ParseErrorKind::Malformed("unbalanced end tag".into())))
            }
        }
    }
}
