use logos::Logos;

/// Coarse tokens for the REPL: bracket balancing and syntax colouring.
///
/// This is not the language parser; it only needs to classify spans.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"//[^\n]*")]
    Comment,

    // Strict string (must end with "). Blaze strings have no escapes.
    #[regex(r#""[^"]*""#)]
    String,

    #[token("let")]
    #[token("fn")]
    #[token("if")]
    #[token("else")]
    #[token("return")]
    Keyword,

    #[token("true")]
    #[token("false")]
    Boolean,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("==")]
    #[token("!=")]
    #[token("<")]
    #[token(">")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("!")]
    #[token("=")]
    Operator,

    #[token(",")]
    #[token(";")]
    #[token(":")]
    Punctuation,
}

/// Returns the bracket nesting depth at the end of `buffer`, or `None` if
/// the buffer ends inside a string or contains an unknown character.
pub fn calculate_depth(buffer: &str) -> Option<usize> {
    let mut depth: isize = 0;

    // Logos returns Result<Token, _> where Err means "could not match".
    for token_res in Token::lexer(buffer) {
        match token_res {
            Ok(Token::LBrace) | Ok(Token::LBracket) | Ok(Token::LParen) => depth += 1,
            Ok(Token::RBrace) | Ok(Token::RBracket) | Ok(Token::RParen) => depth -= 1,

            // Valid tokens that don't affect depth
            Ok(_) => {}

            // An unclosed string (or any unknown char) aborts immediately.
            Err(_) => {
                return None;
            }
        }
    }

    if depth < 0 {
        Some(0)
    } else {
        Some(depth as usize)
    }
}

/// Line validator: keeps reading while brackets are open.
pub struct BracketValidator;

impl reedline::Validator for BracketValidator {
    fn validate(&self, line: &str) -> reedline::ValidationResult {
        match calculate_depth(line) {
            Some(depth) if depth > 0 => reedline::ValidationResult::Incomplete,
            // Unclosed strings and stray characters go to the parser, which
            // reports them with a location.
            _ => reedline::ValidationResult::Complete,
        }
    }
}
