use super::{multiple, Emitted, OrientDbProcessor};
use crate::bag::{EdgeRecord, EndpointRef, Record, VertexRecord};
use crate::error::RenderError;
use crate::render::Script;
use indexmap::IndexSet;

/// Resolves an edge endpoint to script text; the second argument names
/// the endpoint (`from` / `to`) for error reporting
pub(super) type EndpointResolver<'r> =
    dyn FnMut(&EndpointRef, &str) -> Result<String, RenderError> + 'r;

pub(super) fn emit(p: &OrientDbProcessor, records: &[Record]) -> Result<Emitted, RenderError> {
    match records {
        [Record::Vertex(vertex)] => vertex_statement(p, vertex).map(Emitted::Statement),
        [Record::Edge(edge)] => {
            let mut inline = |endpoint: &EndpointRef, location: &str| {
                inline_endpoint(p, endpoint, location)
            };
            edge_statement(p, edge, &mut inline).map(Emitted::Statement)
        }
        _ => match insert_many(p, records)? {
            Some(insert) => Ok(Emitted::Statement(insert)),
            None => multiple::create_batch(p, records).map(Emitted::Batch),
        },
    }
}

fn vertex_class<'a>(p: &'a OrientDbProcessor, vertex: &'a VertexRecord) -> &'a str {
    vertex.label.as_deref().unwrap_or(&p.config().vertex_class)
}

pub(super) fn vertex_statement(
    p: &OrientDbProcessor,
    vertex: &VertexRecord,
) -> Result<String, RenderError> {
    let mut script = Script::start("CREATE VERTEX");
    script
        .push(vertex_class(p, vertex))
        .push_opt(p.content(&vertex.properties)?.map(|c| format!("CONTENT {c}")));
    Ok(script.finish())
}

pub(super) fn edge_statement(
    p: &OrientDbProcessor,
    edge: &EdgeRecord,
    resolve: &mut EndpointResolver<'_>,
) -> Result<String, RenderError> {
    let class = edge.label.as_deref().unwrap_or(&p.config().edge_class);
    let (Some(from), Some(to)) = (&edge.from, &edge.to) else {
        return Err(RenderError::InvalidConstraint(format!(
            "edge {class} must define both endpoints"
        )));
    };

    let from = resolve(from, "from")?;
    let to = resolve(to, "to")?;

    let mut script = Script::start("CREATE EDGE");
    script
        .push(class)
        .push("FROM")
        .push(from)
        .push("TO")
        .push(to)
        .push_opt(p.content(&edge.properties)?.map(|c| format!("CONTENT {c}")));
    Ok(script.finish())
}

/// Endpoint text for a standalone statement: nested retrieves inline as
/// sub-queries, aliases cannot be resolved
pub(super) fn inline_endpoint(
    p: &OrientDbProcessor,
    endpoint: &EndpointRef,
    location: &str,
) -> Result<String, RenderError> {
    match endpoint {
        EndpointRef::Literal(id) => Ok(id.clone()),
        EndpointRef::Embedded(bag) => p.embed(bag, location),
        EndpointRef::Alias(alias) => Err(RenderError::UnresolvedAlias(alias.clone())),
    }
}

/// One `INSERT INTO` for several vertices of the same class.
///
/// Columns are the union of every record's keys in first-seen order;
/// records lacking a key store `null`. Returns `None` when the records
/// cannot share a statement.
pub(super) fn insert_many(
    p: &OrientDbProcessor,
    records: &[Record],
) -> Result<Option<String>, RenderError> {
    let mut vertices = Vec::with_capacity(records.len());
    for record in records {
        match record {
            Record::Vertex(vertex) => vertices.push(vertex),
            Record::Edge(_) => return Ok(None),
        }
    }

    let Some(first) = vertices.first() else {
        return Ok(None);
    };
    let class = vertex_class(p, first);
    if vertices.iter().any(|v| vertex_class(p, v) != class) {
        return Ok(None);
    }

    let keys: IndexSet<&str> = vertices
        .iter()
        .copied()
        .flat_map(|v| v.properties.keys().map(String::as_str))
        .collect();
    if keys.is_empty() {
        return Ok(None);
    }

    let columns = keys.iter().copied().collect::<Vec<_>>().join(", ");
    let rows = vertices
        .iter()
        .map(|vertex| {
            let values = keys
                .iter()
                .map(|key| match vertex.properties.get(*key) {
                    Some(value) => p.cast_value(value, key),
                    None => "null".to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({values})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Some(format!("INSERT INTO {class} ({columns}) VALUES {rows}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::{Bag, Comparator, Conjunction, Constraint};
    use crate::command::Language;
    use crate::render::Processor;

    fn create(records: Vec<Record>) -> Bag {
        Bag {
            create: Some(records),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_vertex() {
        let bag = create(vec![VertexRecord::new("person").with("name", "josh").into()]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(
            command.script(),
            r#"CREATE VERTEX person CONTENT {"name":"josh"}"#
        );
        assert_eq!(command.language(), Language::OrientSql);
    }

    #[test]
    fn test_unlabeled_vertex_without_properties() {
        let bag = create(vec![VertexRecord::unlabeled().into()]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(command.script(), "CREATE VERTEX V");
    }

    #[test]
    fn test_single_edge_with_literal_endpoints() {
        let bag = create(vec![EdgeRecord::new("knows")
            .from("#9:1")
            .to("#9:2")
            .with("since", 2011)
            .into()]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(
            command.script(),
            r#"CREATE EDGE knows FROM #9:1 TO #9:2 CONTENT {"since":2011}"#
        );
    }

    #[test]
    fn test_edge_with_embedded_endpoint_inlines_select() {
        let people = Bag {
            retrieve: Some(vec![]),
            constraints: vec![
                Constraint::new(
                    crate::bag::FieldRef::Label,
                    Comparator::Equal,
                    "person",
                    Conjunction::And,
                ),
                Constraint::new("name", Comparator::Equal, "peter", Conjunction::And),
            ],
            ..Default::default()
        };
        let bag = create(vec![EdgeRecord::new("knows").from("#9:1").to(people).into()]);

        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(
            command.script(),
            "CREATE EDGE knows FROM #9:1 TO (SELECT FROM person WHERE name = 'peter')"
        );
    }

    #[test]
    fn test_embedded_endpoint_must_be_a_retrieve() {
        let delete = Bag {
            delete: true,
            ..Default::default()
        };
        let bag = create(vec![EdgeRecord::new("knows").from(delete).to("#9:2").into()]);

        let err = OrientDbProcessor::new().render(&bag).unwrap_err();
        assert!(matches!(err, RenderError::InvalidEmbedded { location } if location == "from"));
    }

    #[test]
    fn test_alias_endpoint_outside_batch_is_unresolved() {
        let bag = create(vec![EdgeRecord::new("knows")
            .from(EndpointRef::alias("josh"))
            .to("#9:2")
            .into()]);
        let err = OrientDbProcessor::new().render(&bag).unwrap_err();
        assert!(matches!(err, RenderError::UnresolvedAlias(alias) if alias == "josh"));
    }

    #[test]
    fn test_insert_many_backfills_null() {
        let bag = create(vec![
            VertexRecord::new("person").with("a", 1).with("b", "x").into(),
            VertexRecord::new("person").with("c", true).into(),
        ]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(
            command.script(),
            "INSERT INTO person (a, b, c) VALUES (1, 'x', null), (null, null, true)"
        );
    }

    #[test]
    fn test_mixed_classes_become_a_batch() {
        let bag = create(vec![
            VertexRecord::new("person").with("name", "josh").into(),
            VertexRecord::new("software").with("name", "lop").into(),
        ]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(command.language(), Language::OrientSqlBatch);
        assert_eq!(
            command.script(),
            "begin\n\
             LET c1 = CREATE VERTEX person CONTENT {\"name\":\"josh\"}\n\
             LET c2 = CREATE VERTEX software CONTENT {\"name\":\"lop\"}\n\
             commit retry 100\n\
             return [$c1, $c2]"
        );
    }

    #[test]
    fn test_vertices_without_properties_become_a_batch() {
        let bag = create(vec![
            VertexRecord::new("person").into(),
            VertexRecord::new("person").into(),
        ]);
        let command = OrientDbProcessor::new().process(&bag).unwrap();
        assert_eq!(command.language(), Language::OrientSqlBatch);
    }
}
