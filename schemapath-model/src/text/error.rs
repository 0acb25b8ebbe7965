use std::fmt::Display;

/// An error raised while parsing the grammar notation, located within the
/// source text and optionally chained to a more specific cause
#[derive(Debug, PartialEq)]
pub struct ParseError<'a> {
    message: String,
    text: &'a str,
    span: &'a str,
    cause: Option<Box<ParseError<'a>>>,
}

impl<'a> ParseError<'a> {
    /// Constructs an error for the given `span` within the full source `text`
    pub fn new(
        message: String,
        text: &'a str,
        span: &'a str,
        cause: Option<Box<ParseError<'a>>>,
    ) -> ParseError<'a> {
        ParseError {
            message,
            text,
            span,
            cause,
        }
    }

    /// The one-based line number of the span within the source text
    pub fn line_number(&self) -> usize {
        let offset = self.span.as_ptr() as usize - self.text.as_ptr() as usize;
        self.text[..offset].chars().filter(|&c| c == '\n').count() + 1
    }

    /// The most specific error in the cause chain
    pub fn innermost(&self) -> &ParseError<'a> {
        self.cause.as_deref().map_or(self, ParseError::innermost)
    }
}

impl Display for ParseError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lineno = self.line_number();
        let line = self.text.lines().nth(lineno - 1).unwrap_or("<EOF>");
        let column = (self.span.as_ptr() as usize).saturating_sub(line.as_ptr() as usize);
        writeln!(f, "{} at line {lineno}, column {}", self.message, column + 1)?;
        writeln!(f, "  | {line}")?;
        writeln!(f, "  | {0:1$}^", "", column)?;
        if let Some(cause) = &self.cause {
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError<'_> {}
