//! Condition expression parser.
//!
//! Recursive descent parser for the condition grammar:
//!
//! ```text
//! node       := group | condition
//! group      := ("ALL" | "ANY") "(" [node ("," node)*] ")"
//! condition  := comparator "(" operand "," operand ")"
//! comparator := "GT" | "LT" | "GTE" | "LTE" | "CROSSES_ABOVE" | "CROSSES_BELOW"
//! operand    := number | "price" | name ["." field]
//! ```
//!
//! Errors carry the character offset of the offending token. Groups nest at
//! most [`MAX_GROUP_DEPTH`] levels deep.

use crate::domain::condition::{
    Comparator, Condition, ConditionGroup, ConditionNode, GroupLogic, Operand, PRICE_KEYWORD,
};
use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorField;

/// Deepest group nesting an expression may use.
pub const MAX_GROUP_DEPTH: usize = 128;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_word(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .char_indices()
            .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn describe_next(&self) -> String {
        let word = self.peek_word();
        if !word.is_empty() {
            word.to_string()
        } else {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        // Exponent suffix, e.g. 1e6.
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.advance();
            }
            while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_identifier(&mut self) -> Result<&'a str, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        let starts_ok = word
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        if !starts_ok {
            return Err(self.error(format!(
                "expected indicator name, found '{}'",
                self.describe_next()
            )));
        }
        self.pos += word.len();
        Ok(word)
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            let num = self.parse_number()?;
            return Ok(Operand::Constant(num));
        }

        let name = self.parse_identifier()?;
        if name == PRICE_KEYWORD {
            return Ok(Operand::Price);
        }

        if self.peek() == Some('.') {
            self.advance();
            let field_pos = self.pos;
            let field_name = self.peek_word();
            let field = field_name
                .parse::<IndicatorField>()
                .map_err(|message| ParseError {
                    message,
                    position: field_pos,
                })?;
            self.pos += field_name.len();
            return Ok(Operand::indicator_field(name, field));
        }

        Ok(Operand::indicator(name))
    }

    fn parse_condition(&mut self, comparator: Comparator) -> Result<Condition, ParseError> {
        self.pos += comparator.keyword().len();
        self.expect_char('(')?;

        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(Condition::new(left, comparator, right))
    }

    fn parse_group(&mut self, logic: GroupLogic) -> Result<ConditionGroup, ParseError> {
        if self.depth >= MAX_GROUP_DEPTH {
            return Err(self.error(format!(
                "groups nested deeper than {} levels",
                MAX_GROUP_DEPTH
            )));
        }
        self.depth += 1;
        let group = self.parse_group_body(logic)?;
        self.depth -= 1;
        Ok(group)
    }

    fn parse_group_body(&mut self, logic: GroupLogic) -> Result<ConditionGroup, ParseError> {
        self.pos += logic.keyword().len();
        self.expect_char('(')?;

        let mut children = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(ConditionGroup {
                logic,
                children,
            });
        }

        children.push(self.parse_node()?);
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            children.push(self.parse_node()?);
        }

        Ok(ConditionGroup { logic, children })
    }

    fn parse_node(&mut self) -> Result<ConditionNode, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();

        match word {
            "ALL" => return Ok(ConditionNode::Group(self.parse_group(GroupLogic::All)?)),
            "ANY" => return Ok(ConditionNode::Group(self.parse_group(GroupLogic::Any)?)),
            _ => {}
        }

        if let Some(comparator) = Comparator::from_keyword(word) {
            return Ok(ConditionNode::Condition(self.parse_condition(comparator)?));
        }

        Err(self.error(format!(
            "expected ALL, ANY or a comparator, found '{}'",
            self.describe_next()
        )))
    }

    fn parse(&mut self) -> Result<ConditionNode, ParseError> {
        let node = self.parse_node()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(node)
    }
}

/// Parse a single node (group or condition).
pub fn parse_node(input: &str) -> Result<ConditionNode, ParseError> {
    Parser::new(input).parse()
}

/// Parse a condition group; a bare condition is wrapped in a one-child `ALL`.
pub fn parse(input: &str) -> Result<ConditionGroup, ParseError> {
    match parse_node(input)? {
        ConditionNode::Group(group) => Ok(group),
        ConditionNode::Condition(condition) => Ok(ConditionGroup::all(vec![condition.into()])),
    }
}
