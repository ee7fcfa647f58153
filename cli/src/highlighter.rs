use logos::Logos;
use nu_ansi_term::{Color, Style};
use reedline::StyledText;

use crate::lexer::Token;

#[derive(Debug)]
struct PaletteItem<'a> {
    name: &'a str,
    fg: Color,
}

const PALETTE: &[PaletteItem] = &[
    PaletteItem { name: "", fg: Color::White },
    PaletteItem { name: "keyword", fg: Color::Magenta },
    PaletteItem { name: "operator", fg: Color::White },
    PaletteItem { name: "constant", fg: Color::Cyan },
    PaletteItem { name: "number", fg: Color::Cyan },
    PaletteItem { name: "string", fg: Color::Green },
    PaletteItem { name: "comment", fg: Color::DarkGray },
    PaletteItem { name: "variable", fg: Color::Red },
    PaletteItem { name: "punctuation", fg: Color::White },
    PaletteItem { name: "error", fg: Color::LightRed },
];

fn palette(name: &str) -> Color {
    PALETTE
        .iter()
        .find(|item| item.name == name)
        .map_or(PALETTE[0].fg, |item| item.fg)
}

fn class_of(token: &Result<Token, ()>) -> &'static str {
    match token {
        Ok(Token::Keyword) => "keyword",
        Ok(Token::Boolean) => "constant",
        Ok(Token::Integer) => "number",
        Ok(Token::String) => "string",
        Ok(Token::Comment) => "comment",
        Ok(Token::Ident) => "variable",
        Ok(Token::Operator) => "operator",
        Ok(
            Token::LBrace
            | Token::RBrace
            | Token::LBracket
            | Token::RBracket
            | Token::LParen
            | Token::RParen
            | Token::Punctuation,
        ) => "punctuation",
        Err(()) => "error",
    }
}

pub struct Highlighter;

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _: usize) -> StyledText {
        let mut output = StyledText::new();
        let mut curr_end = 0;

        for (token, span) in Token::lexer(line).spanned() {
            // Whitespace skipped by the lexer still has to be echoed back.
            if span.start > curr_end {
                output.push((Style::new(), line[curr_end..span.start].to_string()));
            }
            let style = Style::new().fg(palette(class_of(&token)));
            output.push((style, line[span.clone()].to_string()));
            curr_end = span.end;
        }

        if curr_end < line.len() {
            output.push((Style::new(), line[curr_end..].to_string()));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reedline::Highlighter as _;

    fn rendered(line: &str) -> String {
        Highlighter
            .highlight(line, 0)
            .buffer
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }

    #[test]
    fn test_highlight_preserves_text() {
        for line in ["let x = fn(a) { a + 1 };", "  \"str\" // c", "1 % 2", ""] {
            assert_eq!(rendered(line), line);
        }
    }

    #[test]
    fn test_keyword_colour() {
        let styled = Highlighter.highlight("let x", 0);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Magenta));
        assert_eq!(styled.buffer[0].1, "let");
    }
}
