use std::fmt::{Display, Write as _};

use schemapath_model::QName;
use schemapath_sax::Attribute;

/// What a logged document event was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// An element opened
    Start,
    /// Character data arrived
    Content,
    /// An element closed
    End,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::Start => "start",
            EventKind::Content => "content",
            EventKind::End => "end",
        })
    }
}

/// One traversed event, with enough payload to be re-driven during replay
#[derive(Debug, Clone)]
pub(crate) struct LoggedEvent {
    pub name: QName,
    pub kind: EventKind,
    pub attributes: Vec<Attribute>,
    pub text: String,
}

/// Append-only record of the document seen so far
///
/// Backtracking re-interprets this log from a divergence point; it is never
/// truncated, only re-read.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    events: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn push_start(&mut self, name: &QName, attributes: &[Attribute]) {
        self.events.push(LoggedEvent {
            name: name.clone(),
            kind: EventKind::Start,
            attributes: attributes.to_vec(),
            text: String::new(),
        });
    }

    pub fn push_content(&mut self, name: QName, text: &str) {
        self.events.push(LoggedEvent {
            name,
            kind: EventKind::Content,
            attributes: Vec::new(),
            text: text.to_owned(),
        });
    }

    pub fn push_end(&mut self, name: &QName) {
        self.events.push(LoggedEvent {
            name: name.clone(),
            kind: EventKind::End,
            attributes: Vec::new(),
            text: String::new(),
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn get(&self, index: usize) -> &LoggedEvent {
        &self.events[index]
    }

    /// Renders the trail as `[name:kind | name:kind | …]`
    pub fn render(&self) -> String {
        let mut out = String::from("[");
        for (index, event) in self.events.iter().enumerate() {
            if index > 0 {
                out.push_str(" | ");
            }
            let _ = write!(out, "{}:{}", event.name, event.kind);
        }
        out.push(']');
        out
    }
}
