use std::io;
use std::path;

use crate::config;

/// Lexical classes for the read-only raw display. Mirrors the classes the
/// styled-text widget distinguishes: markup names, attribute names, quoted
/// values, bare numbers, and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Default,
    Tag,
    Attribute,
    Value,
    Number,
}

/// A classified byte range of the source text. Spans are contiguous and
/// cover the whole input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub class: Class,
}

/// Read-only view of a file's on-disk text. Deliberately reflects only the
/// last-saved state, never in-memory edits.
pub struct RawView {
    text: String,
    spans: Vec<Span>,
}

impl RawView {
    pub fn from_file(path: &path::Path) -> Result<RawView, io::Error> {
        let text = std::fs::read_to_string(path)?;
        let spans = highlight(&text);
        Ok(RawView { text, spans })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Palette color for a class, for adapters that style straight from
    /// config.
    pub fn color(class: Class, palette: &config::Highlight) -> String {
        match class {
            Class::Default => palette.default_color.clone(),
            Class::Tag => palette.tag_color.clone(),
            Class::Attribute => palette.attribute_color.clone(),
            Class::Value => palette.value_color.clone(),
            Class::Number => palette.number_color.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Character data between elements.
    Text,
    /// Just saw '<' (or '</'); scanning the element name.
    TagName,
    /// Inside a tag, between attributes.
    TagBody,
    /// Inside a quoted attribute value; the byte is the quote character.
    Quoted(u8),
}

/// Single-pass scanner classifying XML text for display. This is lexical
/// only; it doesn't care whether the document is well-formed.
pub fn highlight(text: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut mode = Mode::Text;

    let push = |spans: &mut Vec<Span>, start: usize, end: usize, class: Class| {
        if start == end {
            return;
        }

        /* coalesce with the previous span when the class continues */
        if let Some(last) = spans.last_mut() {
            if last.end == start && last.class == class {
                last.end = end;
                return;
            }
        }

        spans.push(Span { start, end, class });
    };

    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        match mode {
            Mode::Text => {
                if b == b'<' {
                    push(&mut spans, i, i + 1, Class::Default);
                    mode = Mode::TagName;
                    i += 1;
                } else if b.is_ascii_digit() {
                    let start = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    push(&mut spans, start, i, Class::Number);
                } else {
                    let start = i;
                    while i < bytes.len() && bytes[i] != b'<' && !bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    push(&mut spans, start, i, Class::Default);
                }
            },

            Mode::TagName => {
                if b == b'/' || b == b'!' || b == b'?' {
                    push(&mut spans, i, i + 1, Class::Default);
                    i += 1;
                } else {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
                        i += 1;
                    }
                    push(&mut spans, start, i, Class::Tag);
                    mode = Mode::TagBody;
                }
            },

            Mode::TagBody => {
                if b == b'>' {
                    push(&mut spans, i, i + 1, Class::Default);
                    mode = Mode::Text;
                    i += 1;
                } else if b == b'"' || b == b'\'' {
                    push(&mut spans, i, i + 1, Class::Value);
                    mode = Mode::Quoted(b);
                    i += 1;
                } else if b.is_ascii_whitespace() || b == b'=' || b == b'/' {
                    push(&mut spans, i, i + 1, Class::Default);
                    i += 1;
                } else if b.is_ascii_digit() {
                    let start = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    push(&mut spans, start, i, Class::Number);
                } else {
                    let start = i;
                    while i < bytes.len()
                        && !bytes[i].is_ascii_whitespace()
                        && bytes[i] != b'=' && bytes[i] != b'>' && bytes[i] != b'/'
                        && bytes[i] != b'"' && bytes[i] != b'\'' {
                        i += 1;
                    }
                    push(&mut spans, start, i, Class::Attribute);
                }
            },

            Mode::Quoted(quote) => {
                let start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                if i < bytes.len() {
                    i += 1; /* include the closing quote */
                    mode = Mode::TagBody;
                }
                push(&mut spans, start, i, Class::Value);
            },
        }
    }

    spans
}
