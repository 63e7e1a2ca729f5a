//! Arithmetic for tool-calling agents.
//!
//! Expressions are limited to digits, `.`, `+ - * /`, parentheses and
//! spaces. Within that alphabet `**` is exponentiation and `//` is floor
//! division, with the usual precedence (`**` binds tighter than unary minus
//! and associates to the right).

use std::iter::Peekable;
use std::str::CharIndices;

use async_trait::async_trait;
use delver_config::ToolDescriptor;
use delver_core::error::ToolError;
use delver_core::tool::{Tool, ToolResult};
use thiserror::Error;
use tracing::debug;

const DEFAULT_DESCRIPTION: &str = "Calculate mathematical expressions. Use this for basic arithmetic like addition, subtraction, multiplication, and division.";
const ALLOWED: &str = "0123456789+-*/.() ";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid number '{0}'")]
    BadNumber(String),

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,
}

/// Whether `expression` stays inside the accepted alphabet.
pub fn is_allowed(expression: &str) -> bool {
    expression.chars().all(|c| ALLOWED.contains(c))
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let mut parser = ExprParser {
        chars: expression.char_indices().peekable(),
    };
    let value = parser.sum()?;
    parser.skip_spaces();
    if let Some((offset, found)) = parser.chars.next() {
        return Err(EvalError::Unexpected { found, offset });
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NotFinite)
    }
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

struct ExprParser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl ExprParser<'_> {
    fn skip_spaces(&mut self) {
        while self.chars.next_if(|&(_, c)| c == ' ').is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_spaces();
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Consumes `op` (one or two chars) when the input continues with it.
    fn eat(&mut self, op: &str) -> bool {
        self.skip_spaces();
        let mut ahead = self.chars.clone();
        for expected in op.chars() {
            match ahead.next() {
                Some((_, c)) if c == expected => {}
                _ => return false,
            }
        }
        self.chars = ahead;
        true
    }

    fn sum(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.product()?;
        loop {
            if self.eat("+") {
                acc += self.product()?;
            } else if self.eat("-") {
                acc -= self.product()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn product(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.unary()?;
        loop {
            // `**` belongs to `power`; leave it for the operand parser.
            if self.peek() == Some('*') && !self.at_power() {
                self.eat("*");
                acc *= self.unary()?;
            } else if self.eat("//") {
                let rhs = self.unary()?;
                acc = divide(acc, rhs)?.floor();
            } else if self.eat("/") {
                let rhs = self.unary()?;
                acc = divide(acc, rhs)?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn at_power(&mut self) -> bool {
        self.skip_spaces();
        let mut ahead = self.chars.clone();
        matches!((ahead.next(), ahead.next()), (Some((_, '*')), Some((_, '*'))))
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        if self.eat("-") {
            return Ok(-self.unary()?);
        }
        if self.eat("+") {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.atom()?;
        if self.eat("**") {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, EvalError> {
        self.skip_spaces();
        match self.chars.peek().copied() {
            Some((_, '(')) => {
                self.chars.next();
                let value = self.sum()?;
                self.skip_spaces();
                match self.chars.next() {
                    Some((_, ')')) => Ok(value),
                    Some((offset, found)) => Err(EvalError::Unexpected { found, offset }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some((_, c)) if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some((_, c)) = self.chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
                    literal.push(c);
                }
                literal.parse().map_err(|_| EvalError::BadNumber(literal))
            }
            Some((offset, found)) => Err(EvalError::Unexpected { found, offset }),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

fn divide(lhs: f64, rhs: f64) -> Result<f64, EvalError> {
    if rhs == 0.0 {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(lhs / rhs)
    }
}

/// The `calculator` tool kind. Takes no settings.
pub struct Calculator {
    name: String,
    description: String,
}

impl Calculator {
    pub fn from_descriptor(name: &str, descriptor: &ToolDescriptor) -> Self {
        Self {
            name: name.to_string(),
            description: if descriptor.description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                descriptor.description.clone()
            },
        }
    }

    /// The text handed back to the model for `expression`.
    pub fn calculate(&self, expression: &str) -> (bool, String) {
        if !is_allowed(expression) {
            return (
                false,
                format!(
                    "Error: Invalid characters in expression '{expression}'. Only basic math operations are allowed."
                ),
            );
        }
        match evaluate(expression) {
            Ok(value) => (
                true,
                format!("Calculation result: {expression} = {}", format_number(value)),
            ),
            Err(e) => (false, format!("Error calculating '{expression}': {e}")),
        }
    }
}

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. '15 * 23' or '(2 + 3) / 4'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let expression = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?
            .trim();

        let (success, output) = self.calculate(expression);
        debug!(tool = %self.name, expression, success, "Calculated");
        Ok(ToolResult {
            call_id: String::new(),
            success,
            output,
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> Calculator {
        Calculator::from_descriptor("calculator", &ToolDescriptor::new("calculator", ""))
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
    }

    #[test]
    fn power_and_floor_division() {
        assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ** 2").unwrap(), -4.0);
        assert_eq!(evaluate("3 * 2 ** 2").unwrap(), 12.0);
        assert_eq!(evaluate("7 // 2").unwrap(), 3.0);
        assert_eq!(evaluate("-7 // 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
    }

    #[test]
    fn malformed_expressions_are_errors() {
        assert_eq!(evaluate(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("2 +"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1 // 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1.2.3"), Err(EvalError::BadNumber("1.2.3".into())));
        assert_eq!(evaluate("1 2"), Err(EvalError::Unexpected { found: '2', offset: 2 }));
    }

    #[test]
    fn formats_integral_results_without_fraction() {
        assert_eq!(format_number(345.0), "345");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-4.0), "-4");
    }

    #[test]
    fn rejects_characters_outside_arithmetic() {
        let (ok, out) = calculator().calculate("__import__('os')");
        assert!(!ok);
        assert_eq!(
            out,
            "Error: Invalid characters in expression '__import__('os')'. Only basic math operations are allowed."
        );
    }

    #[tokio::test]
    async fn execute_reports_result_and_errors() {
        let tool = calculator();
        let ok = tool
            .execute(serde_json::json!({"expression": "15 * 23"}))
            .await
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.output, "Calculation result: 15 * 23 = 345");

        let failed = tool
            .execute(serde_json::json!({"expression": "1 / 0"}))
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.output, "Error calculating '1 / 0': division by zero");

        assert!(tool.execute(serde_json::json!({})).await.is_err());
    }

    #[test]
    fn definition_uses_default_description() {
        let def = calculator().to_definition();
        assert_eq!(def.name, "calculator");
        assert!(def.description.starts_with("Calculate mathematical expressions"));
    }
}
