use std::ops::Bound;

use super::{Comparison, Constraint, DomainParseError};

struct Cursor<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.position += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        self.position += len;
        &rest[..len]
    }

    fn error<S: Into<String>>(&self, reason: S) -> DomainParseError {
        self.error_at(self.position, reason)
    }

    fn error_at<S: Into<String>>(&self, position: usize, reason: S) -> DomainParseError {
        DomainParseError {
            text: self.text.to_owned(),
            position,
            reason: reason.into(),
        }
    }

    fn name(&mut self) -> Result<String, DomainParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected a dimension name")),
        }
        Ok(self
            .take_while(|c| c.is_ascii_alphanumeric() || c == '_')
            .to_owned())
    }

    /// Parses an optional number. Returns `None` if no number starts at the current position.
    fn number(&mut self) -> Result<Option<f64>, DomainParseError> {
        self.skip_whitespace();
        let start = self.position;
        let literal =
            self.take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        if literal.is_empty() {
            return Ok(None);
        }
        literal
            .parse::<f64>()
            .map(Some)
            .map_err(|_| self.error_at(start, format!("'{}' is not a number", literal)))
    }

    fn required_number(&mut self) -> Result<f64, DomainParseError> {
        match self.number()? {
            Some(value) => Ok(value),
            None => Err(self.error("expected a number")),
        }
    }

    fn interval(&mut self, negated: bool) -> Result<Constraint, DomainParseError> {
        let start = self.position;
        let lower_inclusive = if self.eat('[') {
            true
        } else if self.eat('(') {
            false
        } else {
            return Err(self.error("expected '[' or '('"));
        };

        let lower_value = self.number()?;
        self.skip_whitespace();

        if lower_inclusive && self.eat(']') {
            // Single value, e.g. 'Classification[2]'
            return match lower_value {
                Some(value) => Ok(Constraint::Interval {
                    lower: Bound::Included(value),
                    upper: Bound::Included(value),
                    negated,
                }),
                None => Err(self.error("expected a number")),
            };
        }
        if !self.eat(':') && !self.eat(',') {
            return Err(self.error("expected ':' or ','"));
        }

        let upper_value = self.number()?;
        self.skip_whitespace();
        let upper_inclusive = if self.eat(']') {
            true
        } else if self.eat(')') {
            false
        } else {
            return Err(self.error("expected ']' or ')'"));
        };

        if let (Some(lower), Some(upper)) = (lower_value, upper_value) {
            if lower > upper {
                return Err(self.error_at(start, "lower bound is greater than upper bound"));
            }
        }

        let bound = |value: Option<f64>, inclusive: bool| match value {
            None => Bound::Unbounded,
            Some(value) if inclusive => Bound::Included(value),
            Some(value) => Bound::Excluded(value),
        };
        Ok(Constraint::Interval {
            lower: bound(lower_value, lower_inclusive),
            upper: bound(upper_value, upper_inclusive),
            negated,
        })
    }

    fn comparison(&mut self, comparison: Comparison) -> Result<Constraint, DomainParseError> {
        let value = self.required_number()?;
        Ok(Constraint::Compare { comparison, value })
    }

    fn constraint(&mut self) -> Result<Constraint, DomainParseError> {
        if self.eat('!') {
            if self.eat('=') {
                return self.comparison(Comparison::NotEqual);
            }
            self.skip_whitespace();
            return self.interval(true);
        }
        if self.eat('<') {
            let comparison = if self.eat('=') {
                Comparison::LessOrEqual
            } else {
                Comparison::Less
            };
            return self.comparison(comparison);
        }
        if self.eat('>') {
            let comparison = if self.eat('=') {
                Comparison::GreaterOrEqual
            } else {
                Comparison::Greater
            };
            return self.comparison(comparison);
        }
        if self.eat('=') {
            if !self.eat('=') {
                return Err(self.error("expected '=='"));
            }
            return self.comparison(Comparison::Equal);
        }
        self.interval(false)
    }
}

/// Splits a domain range text into its dimension name and its constraints
pub(super) fn parse(text: &str) -> Result<(String, Vec<Constraint>), DomainParseError> {
    let mut cursor = Cursor::new(text);
    let name = cursor.name()?;

    let mut constraints = vec![];
    loop {
        cursor.skip_whitespace();
        if cursor.peek().is_none() {
            break;
        }
        constraints.push(cursor.constraint()?);
    }

    if constraints.is_empty() {
        return Err(cursor.error(format!("expected at least one constraint after '{}'", name)));
    }
    Ok((name, constraints))
}
