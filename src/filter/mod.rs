//! Scan predicates.
//!
//! A [`Filter`] is a conjunction of equality conditions. It renders to and parses from
//! the OData form used by table services, e.g.
//!
//! ```
//! use tablestore::filter::Filter;
//!
//! let filter = Filter::partition_key_eq("gear-surf-surfboards");
//! assert_eq!(filter.to_string(), "PartitionKey eq 'gear-surf-surfboards'");
//! assert_eq!("PartitionKey eq 'gear-surf-surfboards'".parse::<Filter>().unwrap(), filter);
//! ```

use crate::entity::{Entity, Property, PARTITION_KEY, ROW_KEY};
use itertools::Itertools;
use std::{
    fmt::{self, Display},
    iter::Peekable,
    str::{CharIndices, FromStr},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Empty filter")]
    Empty,
    #[error("Unexpected {found} at offset {offset}, expected {expected}")]
    Unexpected {
        found: String,
        offset: usize,
        expected: &'static str,
    },
    #[error("Unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    value: Property,
}

impl Condition {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Property {
        &self.value
    }

    fn matches(&self, entity: &Entity) -> bool {
        match self.field.as_str() {
            PARTITION_KEY => self.value.as_str() == Some(entity.partition_key()),
            ROW_KEY => self.value.as_str() == Some(entity.row_key()),
            name => entity
                .get(name)
                .is_some_and(|stored| values_equal(stored, &self.value)),
        }
    }
}

// Numbers compare by value across Int and Double, as the service compares them
fn values_equal(stored: &Property, wanted: &Property) -> bool {
    match (stored, wanted) {
        (Property::Int(i), Property::Double(d)) | (Property::Double(d), Property::Int(i)) => {
            *i as f64 == *d
        }
        _ => stored == wanted,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Property>) -> Self {
        Self {
            conditions: vec![Condition {
                field: field.into(),
                value: value.into(),
            }],
        }
    }

    pub fn partition_key_eq(partition_key: impl Into<String>) -> Self {
        Self::eq(PARTITION_KEY, partition_key.into())
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Property>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|c| c.matches(entity))
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .conditions
            .iter()
            .map(|c| format!("{} eq {}", c.field, Literal(&c.value)))
            .join(" and ");

        f.write_str(&rendered)
    }
}

struct Literal<'a>(&'a Property);

impl Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Property::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Property::Int(i) => write!(f, "{i}"),
            // Debug keeps the fraction so the literal parses back as a double
            Property::Double(d) => write!(f, "{d:?}"),
            Property::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(s);
        let mut conditions = vec![];

        if tokens.peek_is_end() {
            return Err(FilterError::Empty);
        }

        loop {
            let field = tokens.expect_ident()?;
            tokens.expect_keyword("eq")?;
            let value = tokens.expect_literal()?;
            conditions.push(Condition { field, value });

            if tokens.peek_is_end() {
                break;
            }
            tokens.expect_keyword("and")?;
        }

        Ok(Self { conditions })
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Literal(Property),
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => write!(f, "'{w}'"),
            Self::Literal(p) => write!(f, "literal {}", Literal(p)),
        }
    }
}

struct Tokens<'s> {
    source: &'s str,
    chars: Peekable<CharIndices<'s>>,
}

impl<'s> Tokens<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek_is_end(&mut self) -> bool {
        self.skip_whitespace();
        self.chars.peek().is_none()
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn next_token(&mut self) -> Result<Option<(usize, Token)>, FilterError> {
        self.skip_whitespace();

        let Some(&(start, c)) = self.chars.peek() else {
            return Ok(None);
        };

        let token = if c == '\'' {
            self.chars.next();
            Token::Literal(Property::String(self.string_literal(start)?))
        } else if c == '-' || c.is_ascii_digit() {
            Token::Literal(self.number_literal(start)?)
        } else if c.is_alphabetic() || c == '_' {
            let end = self.take_while(|c| c.is_alphanumeric() || c == '_');
            match &self.source[start..end] {
                "true" => Token::Literal(Property::Bool(true)),
                "false" => Token::Literal(Property::Bool(false)),
                word => Token::Word(word.to_string()),
            }
        } else {
            return Err(FilterError::Unexpected {
                found: format!("{c:?}"),
                offset: start,
                expected: "a field name, keyword or literal",
            });
        };

        Ok(Some((start, token)))
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        while self.chars.next_if(|&(_, c)| predicate(c)).is_some() {}
        self.offset()
    }

    fn string_literal(&mut self, start: usize) -> Result<String, FilterError> {
        let mut value = String::new();

        loop {
            match self.chars.next() {
                Some((_, '\'')) => {
                    // A doubled quote is an escaped quote
                    if self.chars.next_if(|(_, c)| *c == '\'').is_some() {
                        value.push('\'');
                    } else {
                        return Ok(value);
                    }
                }
                Some((_, c)) => value.push(c),
                None => return Err(FilterError::UnterminatedString(start)),
            }
        }
    }

    fn number_literal(&mut self, start: usize) -> Result<Property, FilterError> {
        self.chars.next_if(|(_, c)| *c == '-');
        let end = self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
        let text = &self.source[start..end];

        let is_double = text.contains(['.', 'e', 'E']);
        let parsed = if is_double {
            text.parse::<f64>().ok().map(Property::Double)
        } else {
            text.parse::<i64>().ok().map(Property::Int)
        };

        parsed.ok_or_else(|| FilterError::InvalidNumber(text.to_string()))
    }

    fn unexpected(&mut self, found: Option<(usize, Token)>, expected: &'static str) -> FilterError {
        match found {
            Some((offset, token)) => FilterError::Unexpected {
                found: token.to_string(),
                offset,
                expected,
            },
            None => FilterError::Unexpected {
                found: "end of input".into(),
                offset: self.source.len(),
                expected,
            },
        }
    }

    fn expect_ident(&mut self) -> Result<String, FilterError> {
        match self.next_token()? {
            Some((_, Token::Word(word))) if !is_keyword(&word) => Ok(word),
            other => Err(self.unexpected(other, "a field name")),
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), FilterError> {
        match self.next_token()? {
            Some((_, Token::Word(word))) if word.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(self.unexpected(other, keyword)),
        }
    }

    fn expect_literal(&mut self) -> Result<Property, FilterError> {
        match self.next_token()? {
            Some((_, Token::Literal(value))) => Ok(value),
            other => Err(self.unexpected(other, "a literal")),
        }
    }
}

fn is_keyword(word: &str) -> bool {
    word.eq_ignore_ascii_case("eq") || word.eq_ignore_ascii_case("and")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfboard() -> Entity {
        Entity::new("gear-surf-surfboards", "70b63682-b93a-4c77-aad2-65501347265f")
            .with("Name", "Yamba Surfboard")
            .with("Quantity", 12)
            .with("Price", 850.0)
            .with("Clearance", false)
    }

    #[test]
    fn test_render_partition_filter() {
        let filter = Filter::partition_key_eq("gear-surf-surfboards");
        assert_eq!(filter.to_string(), "PartitionKey eq 'gear-surf-surfboards'");
    }

    #[test]
    fn test_render_compound_filter() {
        let filter = Filter::partition_key_eq("o'neill")
            .and_eq("Quantity", 12)
            .and_eq("Price", 850.0)
            .and_eq("Clearance", true);

        assert_eq!(
            filter.to_string(),
            "PartitionKey eq 'o''neill' and Quantity eq 12 and Price eq 850.0 and Clearance eq true"
        );
    }

    #[test]
    fn test_parse_compound_filter() {
        let filter: Filter = "PartitionKey eq 'o''neill' AND Quantity eq -12 and Price eq 8.5e2 and Clearance eq false"
            .parse()
            .unwrap();

        assert_eq!(
            filter,
            Filter::partition_key_eq("o'neill")
                .and_eq("Quantity", -12)
                .and_eq("Price", 850.0)
                .and_eq("Clearance", false)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Filter>(), Err(FilterError::Empty));
        assert_eq!("   ".parse::<Filter>(), Err(FilterError::Empty));
        assert_eq!(
            "PartitionKey eq 'open".parse::<Filter>(),
            Err(FilterError::UnterminatedString(16))
        );
        assert_eq!(
            "Quantity eq 12x".parse::<Filter>(),
            Err(FilterError::InvalidNumber("12x".into()))
        );
        assert!(matches!(
            "PartitionKey 'x'".parse::<Filter>(),
            Err(FilterError::Unexpected { expected: "eq", .. })
        ));
        assert!(matches!(
            "PartitionKey eq".parse::<Filter>(),
            Err(FilterError::Unexpected { expected: "a literal", offset: 15, .. })
        ));
        assert!(matches!(
            "PartitionKey eq 'a' or RowKey eq 'b'".parse::<Filter>(),
            Err(FilterError::Unexpected { expected: "and", .. })
        ));
        assert!(matches!(
            "eq eq 'a'".parse::<Filter>(),
            Err(FilterError::Unexpected { expected: "a field name", offset: 0, .. })
        ));
    }

    #[test]
    fn test_matches() {
        let entity = surfboard();

        assert!(Filter::partition_key_eq("gear-surf-surfboards").matches(&entity));
        assert!(!Filter::partition_key_eq("gear-surf-wetsuits").matches(&entity));
        assert!(Filter::eq("RowKey", "70b63682-b93a-4c77-aad2-65501347265f").matches(&entity));
        assert!(Filter::partition_key_eq("gear-surf-surfboards")
            .and_eq("Quantity", 12)
            .matches(&entity));
        assert!(!Filter::partition_key_eq("gear-surf-surfboards")
            .and_eq("Clearance", true)
            .matches(&entity));
        assert!(!Filter::eq("Colour", "blue").matches(&entity));
    }

    #[test]
    fn test_numeric_comparison() {
        let entity = surfboard();

        assert!(Filter::eq("Quantity", 12.0).matches(&entity));
        assert!(!Filter::eq("Quantity", 12.5).matches(&entity));
        assert!(Filter::eq("Price", 850).matches(&entity));
        assert!("Price eq 850.0".parse::<Filter>().unwrap().matches(&entity));
        assert!(!Filter::eq("Quantity", "12").matches(&entity));
    }
}
