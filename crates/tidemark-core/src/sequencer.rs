//! Referential ordering of rendered statements.
//!
//! Ordinary statements run in the order the differ found them. Referential
//! statements are split by what they do: anything that creates or annotates
//! (contains an `ADD`, `CREATE` or `COMMENT` keyword) runs after every
//! ordinary statement, anything else runs before them.

use serde::{Deserialize, Serialize};

use crate::change::{Direction, OrderingClass};

/// A rendered SQL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// The statement, without a trailing semicolon.
    pub sql: String,
    /// Migration direction.
    pub direction: Direction,
    /// Ordering class.
    pub class: OrderingClass,
}

impl Operator {
    /// Creates an operator.
    #[must_use]
    pub fn new(sql: impl Into<String>, direction: Direction, class: OrderingClass) -> Self {
        Self {
            sql: sql.into(),
            direction,
            class,
        }
    }

    /// Whether this is a referential statement that creates something.
    #[must_use]
    pub fn is_creation(&self) -> bool {
        self.class == OrderingClass::Referential && contains_creation_keyword(&self.sql)
    }
}

/// Collects the operators of one direction and orders them.
#[derive(Debug, Default)]
pub struct Sequencer {
    leading: Vec<Operator>,
    ordinary: Vec<Operator>,
    trailing: Vec<Operator>,
}

impl Sequencer {
    /// Creates an empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operator in discovery order.
    pub fn push(&mut self, operator: Operator) {
        match operator.class {
            OrderingClass::Ordinary => self.ordinary.push(operator),
            OrderingClass::Referential if operator.is_creation() => self.trailing.push(operator),
            OrderingClass::Referential => self.leading.push(operator),
        }
    }

    /// Returns the final order: removals, ordinary statements, creations.
    #[must_use]
    pub fn finish(self) -> Vec<Operator> {
        let mut ordered = self.leading;
        ordered.extend(self.ordinary);
        ordered.extend(self.trailing);
        ordered
    }
}

/// Looks for `ADD`, `CREATE` or `COMMENT` as a keyword, ignoring quoted
/// identifiers and string literals.
///
/// A comment statement needs its column to exist, so it counts as creation.
fn contains_creation_keyword(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut word = String::new();

    for c in sql.chars().chain(std::iter::once(' ')) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if ["ADD", "CREATE", "COMMENT"]
            .iter()
            .any(|keyword| word.eq_ignore_ascii_case(keyword))
        {
            return true;
        }
        word.clear();
        if matches!(c, '"' | '`' | '\'') {
            quote = Some(c);
        }
    }

    false
}
