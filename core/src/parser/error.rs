use crate::parser::{Rule, Span};

/// Parser error with its location in the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("invalid integer literal '{text}'")]
    InvalidInteger { text: String },

    #[error("{message}")]
    Other { message: String },
}

impl ParseError {
    /// Short hint shown under the error label, if there is one.
    pub fn help(&self) -> Option<&'static str> {
        match &self.kind {
            ParseErrorKind::InvalidInteger { .. } => {
                Some("integer literals must fit in a signed 64-bit value")
            }
            ParseErrorKind::UnexpectedToken { found, .. } if found == "end of input" => {
                Some("the input ended early; check for a missing closing delimiter")
            }
            _ => None,
        }
    }
}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::{ErrorVariant, InputLocation, LineColLocation};

    let span = match err.location {
        InputLocation::Pos(pos) => Span(pos..pos),
        InputLocation::Span((start, end)) => Span(start..end),
    };
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            let expected = format_expected_rules(&positives);
            let found = if negatives.is_empty() {
                describe_found(source, span.0.start)
            } else {
                format_expected_rules(&negatives)
            };
            ParseErrorKind::UnexpectedToken { expected, found }
        }
        ErrorVariant::CustomError { message } => {
            if message == "invalid integer literal" {
                ParseErrorKind::InvalidInteger {
                    text: span.str_of(source).to_string(),
                }
            } else {
                ParseErrorKind::Other { message }
            }
        }
    };

    ParseError {
        kind,
        span,
        line,
        column,
    }
}

/// What sits at `pos`, for the "found" half of a message.
fn describe_found(source: &str, pos: usize) -> String {
    match source.get(pos..).and_then(|rest| rest.chars().next()) {
        None => "end of input".to_string(),
        Some(c) => format!("'{}'", c),
    }
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    // Group related rules into higher-level concepts
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = match rule {
            Rule::integer | Rule::boolean | Rule::string => "literal",
            Rule::ident => "identifier",
            Rule::EOI => "end of input",
            Rule::block => "'{'",
            Rule::params => "parameter list",
            Rule::eq
            | Rule::not_eq
            | Rule::lt
            | Rule::gt
            | Rule::add
            | Rule::sub
            | Rule::mul
            | Rule::div => "operator",
            Rule::call_op | Rule::index_op => "call or index",
            Rule::let_statement | Rule::return_statement | Rule::expression_statement => {
                "statement"
            }
            _ => "expression",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.as_slice() {
        [one] => one.to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
        [] => "something else".to_string(),
    }
}
