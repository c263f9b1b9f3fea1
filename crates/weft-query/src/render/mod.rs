//! Dialect processors.
//!
//! Processors translate a validated [`Bag`] into a [`Command`]. They
//! hold configuration only: every piece of per-call state (the script
//! being assembled, resolved targets, batch variables) lives on the
//! stack of a single `process()` call, so one processor can serve any
//! number of threads.

mod batch;
mod cypher;
mod orientdb;

pub use batch::{Batch, StatementKind};
pub use cypher::CypherProcessor;
pub use orientdb::OrientDbProcessor;

use crate::bag::{Bag, Comparator, Conjunction, Constraint, ConstraintValue, FieldRef};
use crate::command::{Command, Language};
use crate::error::{QueryResult, RenderError};
use serde_json::Value;

/// Translates Bags into scripts of one dialect.
pub trait Processor: Send + Sync {
    /// Unique name for this processor
    fn name(&self) -> &'static str;

    /// Dialect of single-statement commands
    fn language(&self) -> Language;

    /// Emit a command for a Bag that is already known to be valid
    fn render(&self, bag: &Bag) -> Result<Command, RenderError>;

    /// Validate, then translate one Bag
    fn process(&self, bag: &Bag) -> QueryResult<Command> {
        bag.validate()?;
        Ok(self.render(bag)?)
    }

    /// Translate a chain of Bags, in order
    fn process_all(&self, bags: &[Bag]) -> QueryResult<Vec<Command>> {
        bags.iter().map(|bag| self.process(bag)).collect()
    }
}

// ============================================================================
// Script assembly
// ============================================================================

/// Clause tokens joined by single spaces
#[derive(Debug, Default)]
pub(crate) struct Script {
    text: String,
}

impl Script {
    pub(crate) fn start(token: impl AsRef<str>) -> Self {
        let mut script = Self::default();
        script.push(token);
        script
    }

    pub(crate) fn push(&mut self, token: impl AsRef<str>) -> &mut Self {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return self;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(token);
        self
    }

    pub(crate) fn push_opt(&mut self, token: Option<impl AsRef<str>>) -> &mut Self {
        if let Some(token) = token {
            self.push(token);
        }
        self
    }

    pub(crate) fn finish(self) -> String {
        self.text
    }
}

/// Single-quoted string literal with `\` and `'` escaped
pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Bare text of an identifier-like literal (record ids, labels)
pub(crate) fn bare(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Target and constraint primitives
// ============================================================================

/// Split off the first `EQUAL` selector accepted by `is_target`.
///
/// The chosen entry supplies the target and is removed from the returned
/// constraint list; it must never also be emitted as a predicate.
pub(crate) fn take_target<'a>(
    constraints: &'a [Constraint],
    is_target: impl Fn(&FieldRef) -> bool,
) -> (Option<&'a Constraint>, Vec<&'a Constraint>) {
    let position = constraints.iter().position(|c| {
        c.comparator == Comparator::Equal
            && is_target(&c.field)
            && matches!(c.value, ConstraintValue::Literal(_))
    });

    let rest = constraints
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != position)
        .map(|(_, c)| c)
        .collect();

    (position.map(|index| &constraints[index]), rest)
}

/// Dialect hooks used by [`render_wheres`]
pub(crate) trait PredicateWriter {
    fn predicate(&self, constraint: &Constraint, index: usize) -> Result<String, RenderError>;

    fn conjunction(&self, conjunction: Conjunction) -> Result<&'static str, RenderError>;
}

/// Render `WHERE p1 c2 p2 ...`, or nothing when no predicate remains.
///
/// Type selectors never become predicates. The conjunction of the first
/// emitted predicate is dropped.
pub(crate) fn render_wheres(
    writer: &impl PredicateWriter,
    constraints: &[&Constraint],
) -> Result<Option<String>, RenderError> {
    let mut clause = String::new();

    for (index, constraint) in constraints
        .iter()
        .filter(|c| c.field != FieldRef::Type)
        .enumerate()
    {
        if index > 0 {
            clause.push(' ');
            clause.push_str(writer.conjunction(constraint.conjunction)?);
            clause.push(' ');
        }
        clause.push_str(&writer.predicate(constraint, index)?);
    }

    Ok((!clause.is_empty()).then(|| format!("WHERE {clause}")))
}
