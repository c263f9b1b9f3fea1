//! OrientDB SQL processor.
//!
//! Renders one Bag as a single OrientDB SQL statement, or as a
//! transactional batch when several records (or several Bags) must be
//! created together:
//! - `CREATE VERTEX` / `CREATE EDGE ... FROM ... TO ...` for one record
//! - `INSERT INTO ... VALUES` for several vertices of one class
//! - `SELECT`, `UPDATE ... MERGE`, `DELETE VERTEX` / `DELETE EDGE`
//! - `begin` .. `commit` batches with `LET`-bound endpoints

mod create;
mod delete;
mod multiple;
mod retrieve;
mod update;

use crate::bag::{
    Bag, Comparator, Conjunction, Constraint, ConstraintValue, ElementType, FieldRef, Operation,
    Order, Properties, ResponseShape,
};
use crate::command::{Command, Language};
use crate::error::{QueryResult, RenderError};
use crate::render::{bare, quote, render_wheres, take_target, PredicateWriter, Processor};
use serde_json::Value;
use tracing::{debug, trace};
use weft_config::OrientDbConfig;

const DIALECT: &str = "OrientDB";

/// OrientDB SQL processor with configurable class names
#[derive(Debug, Clone, Default)]
pub struct OrientDbProcessor {
    config: OrientDbConfig,
}

/// What a Bag turned into
pub(crate) enum Emitted {
    Statement(String),
    Batch(String),
}

/// Record id or class an operation applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Id(String),
    Class(String),
}

impl Target {
    fn as_str(&self) -> &str {
        match self {
            Target::Id(rid) => rid,
            Target::Class(class) => class,
        }
    }
}

impl OrientDbProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OrientDbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrientDbConfig {
        &self.config
    }

    fn emit(&self, bag: &Bag) -> Result<Emitted, RenderError> {
        self.check_capabilities(bag)?;
        if let Some(records) = &bag.create {
            return create::emit(self, records);
        }
        self.statement(bag).map(Emitted::Statement)
    }

    /// Single statement for a retrieve, update or delete
    fn statement(&self, bag: &Bag) -> Result<String, RenderError> {
        match bag.operation() {
            Some(Operation::Retrieve) => retrieve::emit(self, bag),
            Some(Operation::Update) => update::emit(self, bag),
            Some(Operation::Delete) => delete::emit(self, bag),
            Some(Operation::Create) | None => Err(RenderError::MissingOperation),
        }
    }

    fn check_capabilities(&self, bag: &Bag) -> Result<(), RenderError> {
        if bag.map != ResponseShape::Set {
            return Err(RenderError::not_supported(
                DIALECT,
                format!("the {} response shape", bag.map),
            ));
        }
        Ok(())
    }

    /// Translate a nested retrieve into a parenthesised sub-query
    fn embed(&self, bag: &Bag, location: &str) -> Result<String, RenderError> {
        if !bag.is_retrieve() {
            return Err(RenderError::InvalidEmbedded {
                location: location.to_string(),
            });
        }
        self.check_capabilities(bag)?;
        let script = retrieve::emit(self, bag)?;
        trace!(location, "resolved embedded bag");
        Ok(format!("({script})"))
    }

    fn element_type(&self, bag: &Bag) -> Result<ElementType, RenderError> {
        bag.element_type()
            .map_err(|e| RenderError::InvalidConstraint(e.to_string()))
    }

    /// Resolve the target from the first `EQUAL` label or id selector
    fn target<'a>(&self, bag: &'a Bag) -> Result<(Target, Vec<&'a Constraint>), RenderError> {
        let (selector, rest) = take_target(&bag.constraints, |field| {
            matches!(field, FieldRef::Label | FieldRef::Id)
        });

        let target = match selector {
            Some(constraint) => {
                let text = constraint
                    .value
                    .as_literal()
                    .and_then(bare)
                    .ok_or_else(|| {
                        RenderError::InvalidConstraint(format!(
                            "target must be a name or record id, got {:?}",
                            constraint.value
                        ))
                    })?;
                if constraint.field == FieldRef::Id {
                    Target::Id(text)
                } else {
                    Target::Class(text)
                }
            }
            None => match self.element_type(bag)? {
                ElementType::Vertex => Target::Class(self.config.vertex_class.clone()),
                ElementType::Edge => Target::Class(self.config.edge_class.clone()),
            },
        };

        Ok((target, rest))
    }

    fn field_name<'a>(&'a self, field: &'a FieldRef) -> &'a str {
        match field {
            FieldRef::Property(name) => name,
            FieldRef::Id => &self.config.id_field,
            FieldRef::Label | FieldRef::Type => &self.config.label_field,
        }
    }

    /// Literal text for `value` compared against or stored in `field`
    fn cast_value(&self, value: &Value, field: &str) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) if self.config.is_raw_field(field) => s.clone(),
            Value::String(s) => quote(s),
            Value::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|item| self.cast_value(item, field))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Object(_) => value.to_string(),
        }
    }

    /// JSON payload of a record; `None` when there is nothing to store
    fn content(&self, properties: &Properties) -> Result<Option<String>, RenderError> {
        if properties.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(properties)?))
    }

    fn where_clause(&self, constraints: &[&Constraint]) -> Result<Option<String>, RenderError> {
        render_wheres(self, constraints)
    }
}

fn order_clause(order_by: &[(String, Order)]) -> Option<String> {
    if order_by.is_empty() {
        return None;
    }
    let keys = order_by
        .iter()
        .map(|(field, order)| format!("{field} {}", order.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("ORDER BY {keys}"))
}

fn limit_clause(limit: Option<usize>) -> Option<String> {
    limit.map(|n| format!("LIMIT {n}"))
}

impl PredicateWriter for OrientDbProcessor {
    fn predicate(&self, constraint: &Constraint, index: usize) -> Result<String, RenderError> {
        let field = self.field_name(&constraint.field);
        let operator = match constraint.comparator {
            Comparator::Equal => "=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Ne => "<>",
            Comparator::Without => "NOT IN",
            Comparator::In => "IN",
        };
        let value = match &constraint.value {
            ConstraintValue::Literal(value) => self.cast_value(value, field),
            ConstraintValue::Embedded(bag) => self.embed(bag, &format!("where[{index}]"))?,
        };
        Ok(format!("{field} {operator} {value}"))
    }

    fn conjunction(&self, conjunction: Conjunction) -> Result<&'static str, RenderError> {
        match conjunction {
            Conjunction::And => Ok("AND"),
            Conjunction::Or => Ok("OR"),
            Conjunction::Not => Ok("AND NOT"),
            Conjunction::Xor => Err(RenderError::not_supported(DIALECT, "XOR conjunctions")),
        }
    }
}

impl Processor for OrientDbProcessor {
    fn name(&self) -> &'static str {
        "orientdb"
    }

    fn language(&self) -> Language {
        Language::OrientSql
    }

    fn render(&self, bag: &Bag) -> Result<Command, RenderError> {
        let command = match self.emit(bag)? {
            Emitted::Statement(script) => Command::new(script, Language::OrientSql),
            Emitted::Batch(script) => Command::new(script, Language::OrientSqlBatch),
        };
        debug!(
            dialect = DIALECT,
            language = %command.language(),
            operation = bag.operation().map(|op| op.as_str()),
            script_len = command.script().len(),
            "rendered command"
        );
        Ok(command)
    }

    /// Several Bags become one transactional batch; aliases set on earlier
    /// Bags resolve to their bound variables.
    fn process_all(&self, bags: &[Bag]) -> QueryResult<Vec<Command>> {
        match bags {
            [] => Ok(Vec::new()),
            [bag] => Ok(vec![self.process(bag)?]),
            _ => {
                for bag in bags {
                    bag.validate()?;
                }
                let script = multiple::emit(self, bags)?;
                debug!(dialect = DIALECT, bags = bags.len(), "rendered batch");
                Ok(vec![Command::new(script, Language::OrientSqlBatch)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn bag_with(constraints: Vec<Constraint>) -> Bag {
        Bag {
            retrieve: Some(vec![]),
            constraints,
            ..Default::default()
        }
    }

    #[test_case(json!(true), "true")]
    #[test_case(json!(false), "false")]
    #[test_case(json!(null), "null")]
    #[test_case(json!(42), "42")]
    #[test_case(json!(2.5), "2.5")]
    #[test_case(json!("josh"), "'josh'")]
    #[test_case(json!(["a", 1]), "['a', 1]")]
    fn test_cast_value(value: Value, expected: &str) {
        let processor = OrientDbProcessor::new();
        assert_eq!(processor.cast_value(&value, "name"), expected);
    }

    #[test]
    fn test_raw_field_is_never_quoted() {
        let processor = OrientDbProcessor::new();
        assert_eq!(processor.cast_value(&json!("#12:1"), "@rid"), "#12:1");
        assert_eq!(
            processor.cast_value(&json!(["#12:1", "#12:2"]), "@rid"),
            "[#12:1, #12:2]"
        );
    }

    #[test]
    fn test_target_defaults_to_vertex_class() {
        let processor = OrientDbProcessor::new();
        let bag = bag_with(vec![]);
        let (target, rest) = processor.target(&bag).unwrap();
        assert_eq!(target, Target::Class("V".to_string()));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_target_for_edges_uses_edge_class() {
        let processor = OrientDbProcessor::new();
        let bag = bag_with(vec![Constraint::new(
            FieldRef::Type,
            Comparator::Equal,
            "EDGE",
            Conjunction::And,
        )]);
        let (target, rest) = processor.target(&bag).unwrap();
        assert_eq!(target, Target::Class("E".to_string()));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_negated_element_type_does_not_pick_a_class() {
        let bag = bag_with(vec![Constraint::new(
            FieldRef::Type,
            Comparator::Ne,
            "EDGE",
            Conjunction::And,
        )]);
        let err = OrientDbProcessor::new().render(&bag).unwrap_err();
        assert!(matches!(err, RenderError::InvalidConstraint(ref msg) if msg.contains("EQUAL")));
    }

    #[test]
    fn test_target_from_id_is_removed_from_constraints() {
        let processor = OrientDbProcessor::new();
        let bag = bag_with(vec![
            Constraint::new("name", Comparator::Equal, "josh", Conjunction::And),
            Constraint::new(FieldRef::Id, Comparator::Equal, "#12:1", Conjunction::And),
        ]);
        let (target, rest) = processor.target(&bag).unwrap();
        assert_eq!(target, Target::Id("#12:1".to_string()));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_target_with_boolean_label_is_invalid() {
        let processor = OrientDbProcessor::new();
        let bag = bag_with(vec![Constraint::new(
            FieldRef::Label,
            Comparator::Equal,
            true,
            Conjunction::And,
        )]);
        assert!(matches!(
            processor.target(&bag),
            Err(RenderError::InvalidConstraint(_))
        ));
    }

    #[test]
    fn test_custom_classes() {
        let processor = OrientDbProcessor::with_config(OrientDbConfig {
            vertex_class: "Node".to_string(),
            ..Default::default()
        });
        let command = processor.process(&bag_with(vec![])).unwrap();
        assert_eq!(command.script(), "SELECT FROM Node");
    }

    #[test]
    fn test_xor_is_not_supported() {
        let processor = OrientDbProcessor::new();
        let bag = bag_with(vec![
            Constraint::new("a", Comparator::Equal, 1, Conjunction::And),
            Constraint::new("b", Comparator::Equal, 2, Conjunction::Xor),
        ]);
        let err = processor.process(&bag).unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_render_logs_dialect_and_operation() {
        OrientDbProcessor::new().process(&bag_with(vec![])).unwrap();
        assert!(logs_contain("rendered command"));
        assert!(logs_contain("OrientDB"));
        assert!(logs_contain("retrieve"));
    }

    #[test_case(ResponseShape::Path)]
    #[test_case(ResponseShape::Tree)]
    fn test_non_set_shapes_are_not_supported(shape: ResponseShape) {
        let processor = OrientDbProcessor::new();
        let bag = Bag {
            map: shape,
            ..bag_with(vec![])
        };
        assert!(processor.process(&bag).unwrap_err().is_not_supported());
    }
}
