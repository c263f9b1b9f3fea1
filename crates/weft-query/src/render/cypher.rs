//! Cypher processor.
//!
//! Every Bag becomes one `MATCH`/`CREATE` statement. Cypher has no
//! transactional batch script, so record sets the statement form cannot
//! express are reported as capability gaps.

use crate::bag::{
    Bag, Comparator, Conjunction, Constraint, ConstraintValue, EdgeRecord, ElementType,
    EndpointRef, FieldRef, Order, Properties, Record, ResponseShape, VertexRecord,
};
use crate::command::{Command, Language};
use crate::error::RenderError;
use crate::render::{bare, quote, render_wheres, take_target, PredicateWriter, Processor, Script};
use serde_json::Value;
use tracing::debug;
use weft_config::CypherConfig;

const DIALECT: &str = "Cypher";

/// Cypher processor with configurable variable names
#[derive(Debug, Clone, Default)]
pub struct CypherProcessor {
    config: CypherConfig,
}

/// A `MATCH` clause with its `WHERE`, ready for the trailing clauses
struct Matched {
    variable: String,
    element: ElementType,
    script: Script,
}

impl CypherProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CypherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CypherConfig {
        &self.config
    }

    fn check_capabilities(&self, bag: &Bag) -> Result<(), RenderError> {
        if bag.map != ResponseShape::Set {
            return Err(RenderError::not_supported(
                DIALECT,
                format!("the {} response shape", bag.map),
            ));
        }
        if !bag.group_by.is_empty() {
            return Err(RenderError::not_supported(DIALECT, "GROUP BY"));
        }
        Ok(())
    }

    fn emit(&self, bag: &Bag) -> Result<String, RenderError> {
        self.check_capabilities(bag)?;
        if let Some(records) = &bag.create {
            return self.create(records);
        }
        if bag.retrieve.is_some() {
            return self.retrieve(bag);
        }
        if bag.update.is_some() {
            return self.update(bag);
        }
        if bag.delete {
            return self.delete(bag);
        }
        Err(RenderError::MissingOperation)
    }

    /// `MATCH pattern [WHERE ...]` binding nodes to `node` or edges to the
    /// configured edge variable
    fn matched(&self, bag: &Bag, node: &str) -> Result<Matched, RenderError> {
        let element = bag
            .element_type()
            .map_err(|e| RenderError::InvalidConstraint(e.to_string()))?;
        let (selector, rest) = take_target(&bag.constraints, |field| *field == FieldRef::Label);
        let label = selector.map(label_of).transpose()?;

        let (variable, pattern) = match element {
            ElementType::Vertex => {
                let pattern = node_pattern(node, label.as_deref(), None);
                (node.to_string(), pattern)
            }
            ElementType::Edge => {
                let variable = self.config.edge_variable.clone();
                let pattern = format!("()-[{variable}{}]->()", label_suffix(label.as_deref()));
                (variable, pattern)
            }
        };

        let writer = Predicates {
            variable: &variable,
            element,
        };
        let mut script = Script::start("MATCH");
        script.push(pattern).push_opt(render_wheres(&writer, &rest)?);

        Ok(Matched {
            variable,
            element,
            script,
        })
    }

    fn retrieve(&self, bag: &Bag) -> Result<String, RenderError> {
        let Matched {
            variable,
            mut script,
            ..
        } = self.matched(bag, &self.config.node_variable)?;

        let fields = bag.retrieve.as_deref().unwrap_or_default();
        let items = if fields.is_empty() {
            variable.clone()
        } else {
            fields
                .iter()
                .map(|field| format!("{variable}.{field}"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        script
            .push("RETURN")
            .push(items)
            .push_opt(order_clause(&variable, &bag.order_by))
            .push_opt(bag.limit.map(|n| format!("LIMIT {n}")));
        Ok(script.finish())
    }

    fn update(&self, bag: &Bag) -> Result<String, RenderError> {
        let Matched {
            variable,
            mut script,
            ..
        } = self.matched(bag, &self.config.node_variable)?;

        let patch = bag
            .update
            .as_ref()
            .map(map_literal)
            .unwrap_or_else(|| "{}".to_string());

        script
            .push_opt(bag.limit.map(|n| format!("WITH {variable} LIMIT {n}")))
            .push(format!("SET {variable} += {patch}"))
            .push(format!("RETURN {variable}"));
        Ok(script.finish())
    }

    fn delete(&self, bag: &Bag) -> Result<String, RenderError> {
        let Matched {
            variable,
            element,
            mut script,
        } = self.matched(bag, &self.config.node_variable)?;

        script.push_opt(bag.limit.map(|n| format!("WITH {variable} LIMIT {n}")));
        match element {
            ElementType::Vertex => script.push(format!("DETACH DELETE {variable}")),
            ElementType::Edge => script.push(format!("DELETE {variable}")),
        };
        Ok(script.finish())
    }

    fn create(&self, records: &[Record]) -> Result<String, RenderError> {
        match records {
            [Record::Edge(edge)] => self.create_edge(edge),
            _ => {
                let mut vertices = Vec::with_capacity(records.len());
                for record in records {
                    match record {
                        Record::Vertex(vertex) => vertices.push(vertex),
                        Record::Edge(_) => {
                            return Err(RenderError::not_supported(
                                DIALECT,
                                "creating relationships together with other records",
                            ))
                        }
                    }
                }
                Ok(self.create_vertices(&vertices))
            }
        }
    }

    fn create_vertices(&self, vertices: &[&VertexRecord]) -> String {
        let node = &self.config.node_variable;
        if let [vertex] = vertices {
            let pattern = node_pattern(node, vertex.label.as_deref(), Some(&vertex.properties));
            return format!("CREATE {pattern} RETURN {node}");
        }

        let variables: Vec<String> = (0..vertices.len()).map(|i| format!("{node}{i}")).collect();
        let patterns = vertices
            .iter()
            .zip(&variables)
            .map(|(vertex, variable)| {
                node_pattern(variable, vertex.label.as_deref(), Some(&vertex.properties))
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE {patterns} RETURN {}", variables.join(", "))
    }

    fn create_edge(&self, edge: &EdgeRecord) -> Result<String, RenderError> {
        let (Some(from), Some(to)) = (&edge.from, &edge.to) else {
            return Err(RenderError::InvalidConstraint(
                "relationship must define both endpoints".to_string(),
            ));
        };

        let label = edge
            .label
            .as_deref()
            .unwrap_or(&self.config.default_edge_type);
        let variable = &self.config.edge_variable;
        let properties = if edge.properties.is_empty() {
            String::new()
        } else {
            format!(" {}", map_literal(&edge.properties))
        };

        let label = identifier(label);
        let mut script = Script::start(self.endpoint(from, "a", "from", &[])?);
        script
            .push(self.endpoint(to, "b", "to", &["a"])?)
            .push(format!("CREATE (a)-[{variable}:{label}{properties}]->(b)"))
            .push(format!("RETURN {variable}"));
        Ok(script.finish())
    }

    /// `MATCH` binding one relationship endpoint to `variable`.
    ///
    /// `bound` lists the variables matched by earlier clauses; a `WITH`
    /// emitted here must carry them or they fall out of scope.
    fn endpoint(
        &self,
        endpoint: &EndpointRef,
        variable: &str,
        location: &str,
        bound: &[&str],
    ) -> Result<String, RenderError> {
        match endpoint {
            EndpointRef::Literal(id) => {
                Ok(format!("MATCH ({variable}) WHERE id({variable}) = {id}"))
            }
            EndpointRef::Embedded(bag) => {
                if !bag.is_retrieve() {
                    return Err(RenderError::InvalidEmbedded {
                        location: location.to_string(),
                    });
                }
                self.check_capabilities(bag)?;

                let Matched {
                    element,
                    mut script,
                    ..
                } = self.matched(bag, variable)?;
                if element == ElementType::Edge {
                    return Err(RenderError::not_supported(
                        DIALECT,
                        "relationships as relationship endpoints",
                    ));
                }
                if bag.limit.is_some() || !bag.order_by.is_empty() {
                    let mut carried: Vec<&str> = bound.to_vec();
                    carried.push(variable);
                    script
                        .push(format!("WITH {}", carried.join(", ")))
                        .push_opt(order_clause(variable, &bag.order_by))
                        .push_opt(bag.limit.map(|n| format!("LIMIT {n}")));
                }
                Ok(script.finish())
            }
            EndpointRef::Alias(alias) => Err(RenderError::UnresolvedAlias(alias.clone())),
        }
    }
}

/// Predicate rendering bound to one match variable
struct Predicates<'a> {
    variable: &'a str,
    element: ElementType,
}

impl PredicateWriter for Predicates<'_> {
    fn predicate(&self, constraint: &Constraint, _index: usize) -> Result<String, RenderError> {
        let variable = self.variable;
        let value = match &constraint.value {
            ConstraintValue::Literal(value) => value,
            ConstraintValue::Embedded(_) => {
                return Err(RenderError::not_supported(
                    DIALECT,
                    "embedded sub-queries in WHERE",
                ))
            }
        };

        let (field, literal) = match &constraint.field {
            FieldRef::Property(name) => (format!("{variable}.{name}"), cypher_literal(value, false)),
            FieldRef::Id => (format!("id({variable})"), cypher_literal(value, true)),
            FieldRef::Label if self.element == ElementType::Edge => {
                (format!("type({variable})"), cypher_literal(value, false))
            }
            FieldRef::Label => return label_predicate(variable, constraint.comparator, value),
            FieldRef::Type => {
                return Err(RenderError::InvalidConstraint(
                    "element type is not a predicate".to_string(),
                ))
            }
        };

        Ok(match constraint.comparator {
            Comparator::Equal => format!("{field} = {literal}"),
            Comparator::Lt => format!("{field} < {literal}"),
            Comparator::Gt => format!("{field} > {literal}"),
            Comparator::Ge => format!("{field} >= {literal}"),
            Comparator::Le => format!("{field} <= {literal}"),
            Comparator::Ne => format!("{field} <> {literal}"),
            Comparator::In => format!("{field} IN {literal}"),
            Comparator::Without => format!("NOT {field} IN {literal}"),
        })
    }

    fn conjunction(&self, conjunction: Conjunction) -> Result<&'static str, RenderError> {
        Ok(match conjunction {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
            Conjunction::Xor => "XOR",
            Conjunction::Not => "AND NOT",
        })
    }
}

/// Node labels are tested with the `n:Label` pattern predicate
fn label_predicate(
    variable: &str,
    comparator: Comparator,
    value: &Value,
) -> Result<String, RenderError> {
    let label = bare(value).ok_or_else(|| {
        RenderError::InvalidConstraint(format!("label must be a name, got {value}"))
    })?;
    match comparator {
        Comparator::Equal => Ok(format!("{variable}:{}", identifier(&label))),
        Comparator::Ne => Ok(format!("NOT {variable}:{}", identifier(&label))),
        other => Err(RenderError::not_supported(
            DIALECT,
            format!("comparing node labels with {}", other.as_str()),
        )),
    }
}

fn label_of(constraint: &Constraint) -> Result<String, RenderError> {
    constraint.value.as_literal().and_then(bare).ok_or_else(|| {
        RenderError::InvalidConstraint(format!(
            "label must be a name, got {:?}",
            constraint.value
        ))
    })
}

fn label_suffix(label: Option<&str>) -> String {
    label.map(|l| format!(":{}", identifier(l))).unwrap_or_default()
}

fn node_pattern(variable: &str, label: Option<&str>, properties: Option<&Properties>) -> String {
    let properties = match properties {
        Some(properties) if !properties.is_empty() => format!(" {}", map_literal(properties)),
        _ => String::new(),
    };
    format!("({variable}{}{properties})", label_suffix(label))
}

fn order_clause(variable: &str, order_by: &[(String, Order)]) -> Option<String> {
    if order_by.is_empty() {
        return None;
    }
    let keys = order_by
        .iter()
        .map(|(field, order)| format!("{variable}.{field} {}", order.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("ORDER BY {keys}"))
}

/// Label, relationship type or map key, backquoted unless it is a plain
/// identifier
fn identifier(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

/// `{key: value, ...}`
fn map_literal(properties: &Properties) -> String {
    let entries = properties
        .iter()
        .map(|(key, value)| format!("{}: {}", identifier(key), cypher_literal(value, false)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{entries}}}")
}

fn cypher_literal(value: &Value, raw: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if raw => s.clone(),
        Value::String(s) => quote(s),
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| cypher_literal(item, raw))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Object(map) => map_literal(map),
    }
}

impl Processor for CypherProcessor {
    fn name(&self) -> &'static str {
        "cypher"
    }

    fn language(&self) -> Language {
        Language::Cypher
    }

    fn render(&self, bag: &Bag) -> Result<Command, RenderError> {
        let command = Command::new(self.emit(bag)?, Language::Cypher);
        debug!(
            dialect = DIALECT,
            operation = bag.operation().map(|op| op.as_str()),
            script_len = command.script().len(),
            "rendered command"
        );
        Ok(command)
    }
}
