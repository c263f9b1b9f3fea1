use super::{limit_clause, OrientDbProcessor};
use crate::bag::Bag;
use crate::error::RenderError;
use crate::render::Script;

/// `UPDATE target MERGE {..} [WHERE] [LIMIT] RETURN AFTER`
pub(super) fn emit(p: &OrientDbProcessor, bag: &Bag) -> Result<String, RenderError> {
    let (target, rest) = p.target(bag)?;
    let patch = match &bag.update {
        Some(properties) => serde_json::to_string(properties)?,
        None => "{}".to_string(),
    };

    let mut script = Script::start("UPDATE");
    script
        .push(target.as_str())
        .push(format!("MERGE {patch}"))
        .push_opt(p.where_clause(&rest)?)
        .push_opt(limit_clause(bag.limit))
        .push("RETURN AFTER");

    Ok(script.finish())
}
