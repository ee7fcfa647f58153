use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::ast::{Block, Expr, Literal, Program, Statement};
use crate::parser::error::{ParseError, convert_pest_error};

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::not_eq, Assoc::Left)
        )                                               // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left)
        )                                               // `<`, `>`
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                               // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left)
        )                                               // `*`, `/`
        .op(Op::prefix(Rule::bang) | Op::prefix(Rule::neg)) // `!`, `-`
        .op(Op::postfix(Rule::call_op) | Op::postfix(Rule::index_op)) // `()`, `[]`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/program.pest"]
pub struct ProgramParser;

type PestError = pest::error::Error<Rule>;

fn custom_error(message: &str, span: pest::Span<'_>) -> PestError {
    pest::error::Error::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.to_string(),
        },
        span,
    )
}

/// Takes the next inner pair, reporting `what` as missing otherwise.
fn next_pair<'i>(
    pairs: &mut pest::iterators::Pairs<'i, Rule>,
    what: &str,
    span: pest::Span<'i>,
) -> Result<Pair<'i, Rule>, PestError> {
    pairs
        .next()
        .ok_or_else(|| custom_error(&format!("missing {}", what), span))
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement, PestError> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::let_statement => {
            let mut inner = pair.into_inner();
            let name = next_pair(&mut inner, "binding name", span)?.as_str().to_string();
            let value = parse_expr(next_pair(&mut inner, "binding value", span)?)?;
            Ok(Statement::Let { name, value })
        }
        Rule::return_statement => {
            let mut inner = pair.into_inner();
            let value = parse_expr(next_pair(&mut inner, "return value", span)?)?;
            Ok(Statement::Return(value))
        }
        Rule::expression_statement => {
            let mut inner = pair.into_inner();
            let expr = parse_expr(next_pair(&mut inner, "expression", span)?)?;
            Ok(Statement::Expression(expr))
        }
        _ => Err(custom_error(
            &format!("Unhandled statement rule: {:?}", pair.as_rule()),
            span,
        )),
    }
}

fn parse_block(pair: Pair<Rule>) -> Result<Block, PestError> {
    let statements = pair
        .into_inner()
        .map(parse_statement)
        .collect::<Result<_, _>>()?;
    Ok(Block { statements })
}

pub fn parse_expr(pair: Pair<Rule>) -> Result<Expr, PestError> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::expression => PRATT_PARSER
            .map_primary(parse_expr)
            .map_prefix(|op, rhs| {
                let operator = match op.as_rule() {
                    Rule::bang => "!",
                    Rule::neg => "-",
                    _ => unreachable!("Unknown prefix operator: {:?}", op.as_rule()),
                };
                Ok(Expr::prefix(operator, rhs?))
            })
            .map_infix(|lhs, op, rhs| {
                // Operator rules match exactly their own token.
                Ok(Expr::infix(lhs?, op.as_str(), rhs?))
            })
            .map_postfix(|lhs, op| match op.as_rule() {
                Rule::call_op => {
                    let args = op.into_inner().map(parse_expr).collect::<Result<_, _>>()?;
                    Ok(Expr::Call {
                        function: Box::new(lhs?),
                        args,
                    })
                }
                Rule::index_op => {
                    let op_span = op.as_span();
                    let index = parse_expr(next_pair(&mut op.into_inner(), "index", op_span)?)?;
                    Ok(Expr::Index {
                        left: Box::new(lhs?),
                        index: Box::new(index),
                    })
                }
                _ => unreachable!("Unknown postfix operator: {:?}", op.as_rule()),
            })
            .parse(pair.into_inner()),

        Rule::if_expression => {
            let mut inner = pair.into_inner();
            let condition = parse_expr(next_pair(&mut inner, "condition", span)?)?;
            let consequence = parse_block(next_pair(&mut inner, "consequence", span)?)?;
            let alternative = inner.next().map(parse_block).transpose()?;
            Ok(Expr::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            })
        }

        Rule::function => {
            let mut inner = pair.into_inner();
            let params = next_pair(&mut inner, "parameter list", span)?
                .into_inner()
                .map(|p| p.as_str().to_string())
                .collect();
            let body = parse_block(next_pair(&mut inner, "function body", span)?)?;
            Ok(Expr::Function { params, body })
        }

        Rule::array => {
            let items = pair
                .into_inner()
                .map(parse_expr)
                .collect::<Result<_, _>>()?;
            Ok(Expr::Array(items))
        }

        Rule::hash => {
            let entries = pair
                .into_inner()
                .map(parse_hash_entry)
                .collect::<Result<_, _>>()?;
            Ok(Expr::Hash(entries))
        }

        Rule::integer => {
            let value = pair
                .as_str()
                .parse()
                .map_err(|_| custom_error("invalid integer literal", span))?;
            Ok(Expr::Literal(Literal::Int(value)))
        }

        Rule::boolean => {
            let value = match pair.as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(custom_error("invalid boolean literal", span)),
            };
            Ok(Expr::Literal(Literal::Bool(value)))
        }

        Rule::string => {
            let s = pair.as_str();
            let inner = &s[1..s.len() - 1];
            Ok(Expr::Literal(Literal::Str(inner.to_string())))
        }

        Rule::grouped => parse_expr(next_pair(&mut pair.into_inner(), "expression", span)?),

        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string())),

        _ => Err(custom_error(
            &format!("Unhandled rule: {:?}", pair.as_rule()),
            span,
        )),
    }
}

fn parse_hash_entry(pair: Pair<Rule>) -> Result<(Expr, Expr), PestError> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let key = parse_expr(next_pair(&mut inner, "hash key", span)?)?;
    let value = parse_expr(next_pair(&mut inner, "hash value", span)?)?;
    Ok((key, value))
}

fn parse_pest(source: &str) -> Result<Program, PestError> {
    let mut pairs = ProgramParser::parse(Rule::program, source)?;
    let program = pairs.next().ok_or_else(|| {
        pest::error::Error::new_from_pos(
            pest::error::ErrorVariant::CustomError {
                message: "missing program".to_string(),
            },
            pest::Position::from_start(source),
        )
    })?;
    let statements = program
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(parse_statement)
        .collect::<Result<_, _>>()?;
    Ok(Program { statements })
}

/// Parses a whole source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_pest(source).map_err(|err| convert_pest_error(err, source))
}
