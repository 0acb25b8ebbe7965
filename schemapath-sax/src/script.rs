use anyhow::{anyhow, Context as _, Result};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, space0, space1},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair},
    IResult,
};

use schemapath_model::QName;

use crate::{Attribute, EventHandler};

/// One parsed line of an [EventScript]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// `xmlns PREFIX = URI` — a prefix mapping coming into scope
    Mapping {
        /// The declared prefix
        prefix: String,
        /// The mapped namespace URI
        uri: String,
    },
    /// `start NAME attr="value" …` — an element opening
    Start {
        /// The element's qualified name
        name: QName,
        /// Attributes given on the line
        attributes: Vec<Attribute>,
    },
    /// `text "…"` — character data
    Text(String),
    /// `end NAME` — an element closing
    End(QName),
}

/// A line-based stand-in for a parsed XML document
///
/// One event per line: `start NAME [attr="value" …]`, `text "…"`, `end NAME`
/// and `xmlns PREFIX = URI`. Names use Clark notation (`{uri}local`) when
/// qualified. Blank lines and lines starting with `#` are skipped. No escape
/// sequences are recognized inside quoted strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventScript {
    events: Vec<ScriptEvent>,
}

impl EventScript {
    /// Parses a whole script, reporting the offending line on failure
    pub fn parse(text: &str) -> Result<Self> {
        let mut events = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let event = parse_line(line)
                .with_context(|| format!("Bad event on line {}: {line:?}", number + 1))?;
            events.push(event);
        }
        Ok(EventScript { events })
    }

    /// The parsed events in document order
    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    /// Feeds the whole script to `handler`, bracketed by the document events
    pub fn drive<H: EventHandler>(&self, handler: &mut H) -> Result<()> {
        handler.start_document()?;
        for event in &self.events {
            match event {
                ScriptEvent::Mapping { prefix, uri } => {
                    handler.start_prefix_mapping(prefix, uri)?
                }
                ScriptEvent::Start { name, attributes } => {
                    handler.start_element(name, attributes)?
                }
                ScriptEvent::Text(text) => handler.characters(text)?,
                ScriptEvent::End(name) => handler.end_element(name)?,
            }
        }
        handler.end_document()
    }
}

fn parse_line(line: &str) -> Result<ScriptEvent> {
    let (_, event) = all_consuming(alt((mapping, start, text, end)))(line)
        .map_err(|e| anyhow!("{e}"))?;
    Ok(event)
}

type Res<'a, T> = IResult<&'a str, T>;

fn name_text(s: &str) -> Res<&str> {
    recognize(pair(
        opt(delimited(char('{'), is_not("}"), char('}'))),
        take_while1(|c: char| c.is_alphanumeric() || "_-.:".contains(c)),
    ))(s)
}

fn qname(s: &str) -> Res<QName> {
    let (rest, text) = name_text(s)?;
    match QName::parse(text) {
        Ok(name) => Ok((rest, name)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            s,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn quoted(s: &str) -> Res<&str> {
    delimited(
        char('"'),
        map(opt(is_not("\"")), Option::unwrap_or_default),
        char('"'),
    )(s)
}

fn attribute(s: &str) -> Res<Attribute> {
    map(
        separated_pair(
            qname,
            delimited(space0, char('='), space0),
            quoted,
        ),
        |(name, value)| Attribute::new(name, value),
    )(s)
}

fn mapping(s: &str) -> Res<ScriptEvent> {
    map(
        preceded(
            pair(tag("xmlns"), space1),
            separated_pair(
                take_while1(|c: char| c.is_alphanumeric() || "_-.".contains(c)),
                delimited(space0, char('='), space0),
                is_not(" \t"),
            ),
        ),
        |(prefix, uri): (&str, &str)| ScriptEvent::Mapping {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        },
    )(s)
}

fn start(s: &str) -> Res<ScriptEvent> {
    map(
        preceded(
            pair(tag("start"), space1),
            pair(qname, many0(preceded(space1, attribute))),
        ),
        |(name, attributes)| ScriptEvent::Start { name, attributes },
    )(s)
}

fn text(s: &str) -> Res<ScriptEvent> {
    map(
        preceded(pair(tag("text"), space1), quoted),
        |content: &str| ScriptEvent::Text(content.to_owned()),
    )(s)
}

fn end(s: &str) -> Res<ScriptEvent> {
    map(
        preceded(pair(tag("end"), space1), qname),
        ScriptEvent::End,
    )(s)
}
