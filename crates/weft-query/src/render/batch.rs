//! Transactional multi-statement scripts.
//!
//! ```text
//! begin
//! LET c1 = CREATE VERTEX person CONTENT {"name":"josh"}
//! LET s2 = SELECT FROM person WHERE name = 'peter'
//! LET c3 = CREATE EDGE knows FROM $c1 TO $s2
//! commit retry 100
//! return [$c1, $s2, $c3]
//! ```

use crate::bag::Operation;
use crate::error::BatchError;
use tracing::trace;

/// Kind of statement bound in a batch; decides the variable prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Create,
    Update,
    Delete,
}

impl StatementKind {
    pub fn prefix(&self) -> char {
        match self {
            StatementKind::Select => 's',
            StatementKind::Create => 'c',
            StatementKind::Update => 'u',
            StatementKind::Delete => 'd',
        }
    }
}

impl From<Operation> for StatementKind {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Create => StatementKind::Create,
            Operation::Retrieve => StatementKind::Select,
            Operation::Update => StatementKind::Update,
            Operation::Delete => StatementKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BatchState {
    #[default]
    Idle,
    Open,
    Closed,
}

/// Assembles a `begin` .. `commit` script with `LET`-bound results.
///
/// Variable numbers come from one counter shared by all kinds and are
/// never reused, so bindings cannot collide. A Batch is single-use and
/// belongs to one translation.
#[derive(Debug, Clone)]
pub struct Batch {
    lines: Vec<String>,
    bindings: Vec<String>,
    counter: usize,
    retries: u32,
    state: BatchState,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    pub fn new() -> Self {
        Self::with_retries(100)
    }

    /// Batch whose commit asks for `retries` attempts
    pub fn with_retries(retries: u32) -> Self {
        Self {
            lines: Vec::new(),
            bindings: Vec::new(),
            counter: 0,
            retries,
            state: BatchState::Idle,
        }
    }

    pub fn begin(&mut self) -> Result<(), BatchError> {
        match self.state {
            BatchState::Idle => {
                self.lines.push("begin".to_string());
                self.state = BatchState::Open;
                Ok(())
            }
            BatchState::Open => Err(BatchError::AlreadyOpen),
            BatchState::Closed => Err(BatchError::Closed),
        }
    }

    /// Bind `statement` to a fresh variable and return the variable name
    pub fn add_statement(
        &mut self,
        statement: impl AsRef<str>,
        kind: StatementKind,
    ) -> Result<String, BatchError> {
        self.ensure_open()?;

        self.counter += 1;
        let variable = format!("{}{}", kind.prefix(), self.counter);
        trace!(%variable, "batch binding");

        self.lines
            .push(format!("LET {variable} = {}", statement.as_ref()));
        self.bindings.push(variable.clone());
        Ok(variable)
    }

    /// Commit and return every bound variable; yields the whole script
    pub fn end(&mut self) -> Result<String, BatchError> {
        self.ensure_open()?;
        if self.bindings.is_empty() {
            return Err(BatchError::Empty);
        }

        let returned = match self.bindings.as_slice() {
            [only] => format!("${only}"),
            all => format!(
                "[{}]",
                all.iter()
                    .map(|v| format!("${v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        self.lines.push(format!("commit retry {}", self.retries));
        self.lines.push(format!("return {returned}"));
        self.state = BatchState::Closed;
        Ok(self.lines.join("\n"))
    }

    /// Variables bound so far, in binding order
    pub fn variables(&self) -> &[String] {
        &self.bindings
    }

    fn ensure_open(&self) -> Result<(), BatchError> {
        match self.state {
            BatchState::Open => Ok(()),
            BatchState::Idle => Err(BatchError::NotOpen),
            BatchState::Closed => Err(BatchError::Closed),
        }
    }
}
