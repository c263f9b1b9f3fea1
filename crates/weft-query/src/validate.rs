//! Bag validation.
//!
//! Every rule runs, even after an earlier one fails, so a single report
//! lists all violations. Core rules always run first, in declaration
//! order; caller rules follow in registration order.

use crate::bag::{Bag, ConstraintValue, EndpointRef, Record};
use crate::error::ValidationError;
use std::sync::Arc;

/// A check run against a Bag.
///
/// Returns `Ok(())` when the Bag satisfies the rule, otherwise every
/// message describing what is wrong.
pub trait BagRule: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str {
        "custom"
    }

    fn check(&self, bag: &Bag) -> Result<(), Vec<String>>;
}

impl<F> BagRule for F
where
    F: Fn(&Bag) -> Result<(), Vec<String>> + Send + Sync,
{
    fn check(&self, bag: &Bag) -> Result<(), Vec<String>> {
        self(bag)
    }
}

/// Invariants every Bag must satisfy regardless of dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreRule {
    /// Exactly one of create, retrieve, update or delete
    SingleOperation,
    /// Every edge record names both endpoints
    EdgeEndpoints,
    /// Bags nested in endpoints and constraint values are valid themselves
    NestedBags,
}

impl CoreRule {
    pub const ALL: [CoreRule; 3] = [
        CoreRule::SingleOperation,
        CoreRule::EdgeEndpoints,
        CoreRule::NestedBags,
    ];
}

impl BagRule for CoreRule {
    fn name(&self) -> &str {
        match self {
            CoreRule::SingleOperation => "single_operation",
            CoreRule::EdgeEndpoints => "edge_endpoints",
            CoreRule::NestedBags => "nested_bags",
        }
    }

    fn check(&self, bag: &Bag) -> Result<(), Vec<String>> {
        let violations = match self {
            CoreRule::SingleOperation => single_operation(bag),
            CoreRule::EdgeEndpoints => edge_endpoints(bag),
            CoreRule::NestedBags => nested_bags(bag),
        };
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn single_operation(bag: &Bag) -> Vec<String> {
    let operations = bag.operations();
    let mut violations = Vec::new();

    match operations.len() {
        0 => violations.push(
            "Bag must perform at least one operation (create, retrieve, update or delete)"
                .to_string(),
        ),
        1 => {}
        _ => violations.push(format!(
            "Bag must perform only one operation, found: {}",
            operations
                .iter()
                .map(|op| op.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }

    if matches!(&bag.create, Some(records) if records.is_empty()) {
        violations.push("Bag create operation must hold at least one record".to_string());
    }

    violations
}

fn edge_endpoints(bag: &Bag) -> Vec<String> {
    let Some(records) = &bag.create else {
        return Vec::new();
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match record {
            Record::Edge(edge) if edge.from.is_none() || edge.to.is_none() => Some(format!(
                "create[{index}]: edge must define both its out vertex and its in vertex"
            )),
            _ => None,
        })
        .collect()
}

fn nested_bags(bag: &Bag) -> Vec<String> {
    let mut violations = Vec::new();

    if let Some(records) = &bag.create {
        for (index, record) in records.iter().enumerate() {
            let Record::Edge(edge) = record else {
                continue;
            };
            for (end, endpoint) in [("from", &edge.from), ("to", &edge.to)] {
                if let Some(EndpointRef::Embedded(nested)) = endpoint {
                    let location = format!("create[{index}].{end}");
                    violations.extend(prefixed(&location, nested));
                }
            }
        }
    }

    for (index, constraint) in bag.constraints.iter().enumerate() {
        if let ConstraintValue::Embedded(nested) = &constraint.value {
            violations.extend(prefixed(&format!("where[{index}]"), nested));
        }
    }

    violations
}

fn prefixed(location: &str, nested: &Bag) -> Vec<String> {
    Validator::new()
        .violations(nested)
        .into_iter()
        .map(|message| format!("{location}: {message}"))
        .collect()
}

/// Runs the core rules plus any caller-supplied rules
#[derive(Clone, Default)]
pub struct Validator {
    rules: Vec<Arc<dyn BagRule>>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dialect- or caller-specific rule
    pub fn with_rule(mut self, rule: impl BagRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Collect every violation without failing
    pub fn violations(&self, bag: &Bag) -> Vec<String> {
        let mut violations = Vec::new();
        for rule in CoreRule::ALL {
            if let Err(messages) = rule.check(bag) {
                violations.extend(messages);
            }
        }
        for rule in &self.rules {
            if let Err(messages) = rule.check(bag) {
                violations.extend(messages);
            }
        }
        violations
    }

    pub fn validate(&self, bag: &Bag) -> Result<(), ValidationError> {
        let violations = self.violations(bag);
        if violations.is_empty() {
            Ok(())
        } else {
            tracing::trace!(count = violations.len(), "bag failed validation");
            Err(ValidationError::new(violations))
        }
    }
}

impl Bag {
    /// Check the core invariants
    pub fn validate(&self) -> Result<(), ValidationError> {
        Validator::new().validate(self)
    }

    /// Check the core invariants followed by `rules`
    pub fn validate_with(&self, rules: &[&dyn BagRule]) -> Result<(), ValidationError> {
        let mut violations = Validator::new().violations(self);
        for rule in rules {
            if let Err(messages) = rule.check(self) {
                violations.extend(messages);
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }

    /// Silent validation: the list of violations, empty when valid
    pub fn violations(&self) -> Vec<String> {
        Validator::new().violations(self)
    }
}
