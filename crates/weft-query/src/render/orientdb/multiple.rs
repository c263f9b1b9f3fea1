//! Batches spanning several records or several Bags.

use super::create::{edge_statement, insert_many, vertex_statement};
use super::{retrieve, OrientDbProcessor};
use crate::bag::{Bag, EndpointRef, Record};
use crate::error::RenderError;
use crate::render::{Batch, StatementKind};
use std::collections::HashMap;
use tracing::trace;

/// Alias name to the variable bound for it
type Bindings<'a> = HashMap<&'a str, String>;

/// One Bag creating records that cannot share a statement
pub(super) fn create_batch(p: &OrientDbProcessor, records: &[Record]) -> Result<String, RenderError> {
    let mut batch = Batch::with_retries(p.config().commit_retries);
    batch.begin()?;

    let bindings = Bindings::new();
    for record in records {
        bind_record(p, &mut batch, record, &bindings)?;
    }

    Ok(batch.end()?)
}

/// A chain of Bags in one transaction; an aliased Bag's variable is
/// visible to the Bags after it
pub(super) fn emit(p: &OrientDbProcessor, bags: &[Bag]) -> Result<String, RenderError> {
    let mut batch = Batch::with_retries(p.config().commit_retries);
    batch.begin()?;

    let mut bindings = Bindings::new();
    for bag in bags {
        p.check_capabilities(bag)?;

        let variable = match &bag.create {
            Some(records) => bind_records(p, &mut batch, records, &bindings)?,
            None => {
                let kind = bag
                    .operation()
                    .map(StatementKind::from)
                    .ok_or(RenderError::MissingOperation)?;
                batch.add_statement(p.statement(bag)?, kind)?
            }
        };

        if let Some(alias) = bag.alias.as_deref() {
            trace!(alias, %variable, "bound alias");
            bindings.insert(alias, variable);
        }
    }

    Ok(batch.end()?)
}

/// Bind a Bag's records, preferring a single statement; yields the last
/// variable bound
fn bind_records(
    p: &OrientDbProcessor,
    batch: &mut Batch,
    records: &[Record],
    bindings: &Bindings<'_>,
) -> Result<String, RenderError> {
    if let [Record::Vertex(vertex)] = records {
        return Ok(batch.add_statement(vertex_statement(p, vertex)?, StatementKind::Create)?);
    }
    if let Some(insert) = insert_many(p, records)? {
        return Ok(batch.add_statement(insert, StatementKind::Create)?);
    }

    let mut last = None;
    for record in records {
        last = Some(bind_record(p, batch, record, bindings)?);
    }
    last.ok_or(RenderError::MissingOperation)
}

fn bind_record(
    p: &OrientDbProcessor,
    batch: &mut Batch,
    record: &Record,
    bindings: &Bindings<'_>,
) -> Result<String, RenderError> {
    let statement = match record {
        Record::Vertex(vertex) => vertex_statement(p, vertex)?,
        Record::Edge(edge) => {
            let mut bound = |endpoint: &EndpointRef, location: &str| {
                bound_endpoint(p, batch, bindings, endpoint, location)
            };
            edge_statement(p, edge, &mut bound)?
        }
    };
    Ok(batch.add_statement(statement, StatementKind::Create)?)
}

/// Endpoint text inside a batch: nested retrieves are bound to their own
/// `s` variable first, aliases resolve to earlier bindings
fn bound_endpoint(
    p: &OrientDbProcessor,
    batch: &mut Batch,
    bindings: &Bindings<'_>,
    endpoint: &EndpointRef,
    location: &str,
) -> Result<String, RenderError> {
    match endpoint {
        EndpointRef::Literal(id) => Ok(id.clone()),
        EndpointRef::Embedded(bag) => {
            if !bag.is_retrieve() {
                return Err(RenderError::InvalidEmbedded {
                    location: location.to_string(),
                });
            }
            p.check_capabilities(bag)?;
            let variable = batch.add_statement(retrieve::emit(p, bag)?, StatementKind::Select)?;
            Ok(format!("${variable}"))
        }
        EndpointRef::Alias(alias) => bindings
            .get(alias.as_str())
            .map(|variable| format!("${variable}"))
            .ok_or_else(|| RenderError::UnresolvedAlias(alias.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::{Comparator, Conjunction, Constraint, EdgeRecord, FieldRef, VertexRecord};
    use crate::command::Language;
    use crate::render::Processor;

    fn create(records: Vec<Record>, alias: Option<&str>) -> Bag {
        Bag {
            create: Some(records),
            alias: alias.map(str::to_string),
            ..Default::default()
        }
    }

    fn person(name: &str) -> Bag {
        Bag {
            retrieve: Some(vec![]),
            constraints: vec![
                Constraint::new(FieldRef::Label, Comparator::Equal, "person", Conjunction::And),
                Constraint::new("name", Comparator::Equal, name, Conjunction::And),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_embedded_endpoints_are_bound_in_order() {
        let bag = create(
            vec![
                VertexRecord::new("person").with("name", "josh").into(),
                EdgeRecord::new("knows").from("#9:1").to(person("peter")).into(),
            ],
            None,
        );

        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(command.language(), Language::OrientSqlBatch);
        assert_eq!(
            command.script(),
            "begin\n\
             LET c1 = CREATE VERTEX person CONTENT {\"name\":\"josh\"}\n\
             LET s2 = SELECT FROM person WHERE name = 'peter'\n\
             LET c3 = CREATE EDGE knows FROM #9:1 TO $s2\n\
             commit retry 100\n\
             return [$c1, $s2, $c3]"
        );
    }

    #[test]
    fn test_aliases_resolve_across_bags() {
        let bags = vec![
            create(vec![VertexRecord::new("person").with("name", "josh").into()], Some("josh")),
            create(vec![VertexRecord::new("software").with("name", "lop").into()], Some("lop")),
            create(
                vec![EdgeRecord::new("created")
                    .from(EndpointRef::alias("josh"))
                    .to(EndpointRef::alias("lop"))
                    .into()],
                None,
            ),
        ];

        let commands = OrientDbProcessor::new().process_all(&bags).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].script(),
            "begin\n\
             LET c1 = CREATE VERTEX person CONTENT {\"name\":\"josh\"}\n\
             LET c2 = CREATE VERTEX software CONTENT {\"name\":\"lop\"}\n\
             LET c3 = CREATE EDGE created FROM $c1 TO $c2\n\
             commit retry 100\n\
             return [$c1, $c2, $c3]"
        );
    }

    #[test]
    fn test_mixed_operations_use_their_prefixes() {
        let bags = vec![
            person("josh"),
            Bag {
                delete: true,
                constraints: vec![Constraint::new(
                    FieldRef::Id,
                    Comparator::Equal,
                    "#9:9",
                    Conjunction::And,
                )],
                ..Default::default()
            },
        ];

        let commands = OrientDbProcessor::new().process_all(&bags).unwrap();
        assert!(commands[0]
            .script()
            .contains("LET s1 = SELECT FROM person WHERE name = 'josh'\nLET d2 = DELETE VERTEX #9:9"));
    }

    #[test]
    fn test_unknown_alias_fails() {
        let bags = vec![
            person("josh"),
            create(
                vec![EdgeRecord::new("knows")
                    .from(EndpointRef::alias("nobody"))
                    .to("#9:1")
                    .into()],
                None,
            ),
        ];
        let err = OrientDbProcessor::new().process_all(&bags).unwrap_err();
        assert_eq!(err.category(), "render");
    }

    #[test]
    fn test_every_bag_is_validated_first() {
        let bags = vec![person("josh"), Bag::new()];
        let err = OrientDbProcessor::new().process_all(&bags).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_zero_and_one_bag() {
        let processor = OrientDbProcessor::new();
        assert!(processor.process_all(&[]).unwrap().is_empty());

        let commands = processor.process_all(&[person("josh")]).unwrap();
        assert_eq!(commands[0].language(), Language::OrientSql);
    }

    #[test]
    fn test_commit_retries_follow_config() {
        let processor = OrientDbProcessor::with_config(weft_config::OrientDbConfig {
            commit_retries: 3,
            ..Default::default()
        });
        let commands = processor
            .process_all(&[person("a"), person("b")])
            .unwrap();
        assert!(commands[0].script().contains("commit retry 3\n"));
    }
}
