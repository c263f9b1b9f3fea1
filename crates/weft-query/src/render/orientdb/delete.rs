use super::{limit_clause, OrientDbProcessor, Target};
use crate::bag::{Bag, ElementType};
use crate::error::RenderError;
use crate::render::Script;

/// `DELETE VERTEX target [WHERE] [LIMIT]`, or `DELETE EDGE rid` for a
/// single edge addressed by record id
pub(super) fn emit(p: &OrientDbProcessor, bag: &Bag) -> Result<String, RenderError> {
    let element = p.element_type(bag)?;
    let (target, rest) = p.target(bag)?;

    match element {
        ElementType::Vertex => {
            let mut script = Script::start("DELETE VERTEX");
            script
                .push(target.as_str())
                .push_opt(p.where_clause(&rest)?)
                .push_opt(limit_clause(bag.limit));
            Ok(script.finish())
        }
        ElementType::Edge => {
            let predicates = p.where_clause(&rest)?;
            match target {
                Target::Id(rid) if predicates.is_none() && bag.limit.is_none() => {
                    Ok(format!("DELETE EDGE {rid}"))
                }
                _ => Err(RenderError::Unimplemented(
                    "deleting edges selected by constraints".to_string(),
                )),
            }
        }
    }
}
