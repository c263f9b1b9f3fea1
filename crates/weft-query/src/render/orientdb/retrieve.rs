use super::{limit_clause, order_clause, OrientDbProcessor, DIALECT};
use crate::bag::Bag;
use crate::error::RenderError;
use crate::render::Script;

/// `SELECT [fields] FROM target [WHERE] [GROUP BY] [ORDER BY] [LIMIT]`
pub(super) fn emit(p: &OrientDbProcessor, bag: &Bag) -> Result<String, RenderError> {
    if bag.group_by.len() > 1 {
        return Err(RenderError::not_supported(
            DIALECT,
            "GROUP BY on more than one field",
        ));
    }

    let (target, rest) = p.target(bag)?;

    let mut script = Script::start("SELECT");
    if let Some(fields) = bag.retrieve.as_ref().filter(|fields| !fields.is_empty()) {
        script.push(fields.join(", "));
    }
    script
        .push("FROM")
        .push(target.as_str())
        .push_opt(p.where_clause(&rest)?)
        .push_opt(bag.group_by.first().map(|field| format!("GROUP BY {field}")))
        .push_opt(order_clause(&bag.order_by))
        .push_opt(limit_clause(bag.limit));

    Ok(script.finish())
}
