//! Fluent construction of Bags.
//!
//! [`BaseBuilder`] owns an ordered sequence of Bags and mutates the last
//! one. Starting a different operation once the last Bag already has one
//! chains a new Bag that inherits the accumulated `where` constraints,
//! so "retrieve, then delete" reads as two calls on one builder.
//!
//! [`Builder`] adds the by-value sugar used by callers and hands the
//! finished Bag(s) to a [`Processor`].
//!
//! ```
//! use weft_query::{Builder, OrientDbProcessor};
//!
//! let command = Builder::new()
//!     .select(["name"])
//!     .from("person")
//!     .where_eq("age", 30)
//!     .first()
//!     .get_script(&OrientDbProcessor::new())
//!     .unwrap();
//!
//! assert_eq!(command.script(), "SELECT name FROM person WHERE age = 30 LIMIT 1");
//! ```

use crate::bag::{
    Bag, Comparator, Conjunction, Constraint, ConstraintValue, ElementType, FieldRef, Operation,
    Order, Properties, Record, ResponseShape,
};
use crate::command::Command;
use crate::error::{BuildError, QueryResult};
use crate::render::Processor;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Primitive Bag mutations shared by every builder
#[derive(Debug, Clone, Default)]
pub struct BaseBuilder {
    bags: Vec<Bag>,
    aliases: HashMap<String, usize>,
}

impl BaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last Bag, created on demand
    fn last(&mut self) -> &mut Bag {
        if self.bags.is_empty() {
            self.bags.push(Bag::new());
        }
        let index = self.bags.len() - 1;
        &mut self.bags[index]
    }

    /// The Bag that should receive `operation`, chaining a new one when the
    /// last Bag already performs something else
    fn for_operation(&mut self, operation: Operation) -> &mut Bag {
        let chained = match self.bags.last() {
            Some(bag) => match bag.operation() {
                Some(current) if current != operation => Some(Bag {
                    constraints: bag.constraints.clone(),
                    ..Default::default()
                }),
                _ => None,
            },
            None => None,
        };

        if let Some(bag) = chained {
            trace!(operation = operation.as_str(), bags = self.bags.len() + 1, "chained bag");
            self.bags.push(bag);
        }
        self.last()
    }

    pub fn internal_create(&mut self, records: Vec<Record>) -> &mut Self {
        self.for_operation(Operation::Create)
            .create
            .get_or_insert_with(Vec::new)
            .extend(records);
        self
    }

    /// Add projected fields; no fields means every field
    pub fn internal_retrieve(&mut self, fields: Vec<String>) -> &mut Self {
        self.for_operation(Operation::Retrieve)
            .retrieve
            .get_or_insert_with(Vec::new)
            .extend(fields);
        self
    }

    /// Merge `properties` into the pending patch
    pub fn internal_update(&mut self, properties: Properties) -> &mut Self {
        self.for_operation(Operation::Update)
            .update
            .get_or_insert_with(Properties::new)
            .extend(properties);
        self
    }

    pub fn internal_delete(&mut self) -> &mut Self {
        self.for_operation(Operation::Delete).delete = true;
        self
    }

    /// Append constraints to the last Bag.
    ///
    /// Element type selectors must compare `EQUAL` against `VERTEX` or `EDGE`.
    pub fn internal_where(&mut self, constraints: Vec<Constraint>) -> Result<&mut Self, BuildError> {
        for constraint in constraints.iter().filter(|c| c.field == FieldRef::Type) {
            constraint.selected_element_type()?;
        }
        self.last().constraints.extend(constraints);
        Ok(self)
    }

    /// Append one `[field, comparator, value, conjunction]` array
    pub fn internal_where_parts(&mut self, parts: &[Value]) -> Result<&mut Self, BuildError> {
        let constraint = Constraint::try_from(parts)?;
        self.internal_where(vec![constraint])
    }

    /// Replace the projection list of the retrieve
    pub fn internal_projections(&mut self, fields: Vec<String>) -> &mut Self {
        self.for_operation(Operation::Retrieve).retrieve = Some(fields);
        self
    }

    /// Set one property on the pending update, or on the last record being
    /// created. A Bag with neither starts an update.
    pub fn data(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let (key, value) = (key.into(), value.into());
        let bag = self.last();
        if let Some(record) = bag.create.as_mut().and_then(|records| records.last_mut()) {
            record.properties_mut().insert(key, value);
        } else if let Some(update) = bag.update.as_mut() {
            update.insert(key, value);
        } else {
            self.internal_update(Properties::from_iter([(key, value)]));
        }
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.last().limit = Some(limit);
        self
    }

    pub fn group_by(&mut self, fields: Vec<String>) -> &mut Self {
        self.last().group_by.extend(fields);
        self
    }

    pub fn order_by(&mut self, field: impl Into<String>, order: Order) -> &mut Self {
        self.last().order_by.push((field.into(), order));
        self
    }

    pub fn map(&mut self, shape: ResponseShape) -> &mut Self {
        self.last().map = shape;
        self
    }

    /// Name the last Bag so later Bags can refer to it
    pub fn set(&mut self, alias: impl Into<String>) -> &mut Self {
        let alias = alias.into();
        self.last().alias = Some(alias.clone());
        let index = self.bags.len() - 1;
        self.aliases.insert(alias, index);
        self
    }

    pub fn get(&self, alias: &str) -> Result<&Bag, BuildError> {
        self.aliases
            .get(alias)
            .and_then(|index| self.bags.get(*index))
            .ok_or_else(|| BuildError::UnknownAlias(alias.to_string()))
    }

    /// The Bag currently being built
    pub fn bag(&self) -> Option<&Bag> {
        self.bags.last()
    }

    pub fn bags(&self) -> &[Bag] {
        &self.bags
    }

    pub fn into_bags(self) -> Vec<Bag> {
        self.bags
    }

    pub fn clear(&mut self) {
        self.bags.clear();
        self.aliases.clear();
    }

    fn last_records_mut(&mut self) -> Option<&mut Vec<Record>> {
        self.bags.last_mut().and_then(|bag| bag.create.as_mut())
    }
}

/// End-user query builder.
///
/// Mutators take and return `self`; the fallible ones return
/// `Result<Self, BuildError>`.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    base: BaseBuilder,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> &BaseBuilder {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BaseBuilder {
        &mut self.base
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base
            .internal_retrieve(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn select_all(mut self) -> Self {
        self.base.internal_retrieve(Vec::new());
        self
    }

    pub fn insert(mut self, record: impl Into<Record>) -> Self {
        self.base.internal_create(vec![record.into()]);
        self
    }

    pub fn insert_many<I, R>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Record>,
    {
        self.base
            .internal_create(records.into_iter().map(Into::into).collect());
        self
    }

    pub fn update(mut self, properties: Properties) -> Self {
        self.base.internal_update(properties);
        self
    }

    pub fn update_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base
            .internal_update(Properties::from_iter([(key.into(), value.into())]));
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base.data(key, value);
        self
    }

    pub fn delete(mut self) -> Self {
        self.base.internal_delete();
        self
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Target a class or label
    pub fn from(self, label: impl Into<String>) -> Self {
        self.where_(FieldRef::Label, Comparator::Equal, label.into())
    }

    /// Label the records being created that have none; otherwise the same
    /// as [`from`](Self::from)
    pub fn into(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        match self.base.last_records_mut() {
            Some(records) => {
                for record in records.iter_mut() {
                    record.label_mut().get_or_insert_with(|| label.clone());
                }
                self
            }
            None => self.from(label),
        }
    }

    /// Target one record id
    pub fn record(self, id: impl Into<String>) -> Self {
        self.where_(FieldRef::Id, Comparator::Equal, id.into())
    }

    /// Match any of several record ids
    pub fn records<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<Value> = ids.into_iter().map(|id| Value::String(id.into())).collect();
        self.where_(FieldRef::Id, Comparator::In, ids)
    }

    pub fn of_type(self, element: ElementType) -> Self {
        self.where_(FieldRef::Type, Comparator::Equal, element.as_str())
    }

    pub fn vertices(self) -> Self {
        self.of_type(ElementType::Vertex)
    }

    pub fn edges(self) -> Self {
        self.of_type(ElementType::Edge)
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    fn push_where(
        mut self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
        conjunction: Conjunction,
    ) -> Self {
        self.base
            .last()
            .constraints
            .push(Constraint::new(field, comparator, value, conjunction));
        self
    }

    pub fn where_(
        self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
    ) -> Self {
        self.push_where(field, comparator, value, Conjunction::And)
    }

    pub fn where_eq(self, field: impl Into<FieldRef>, value: impl Into<ConstraintValue>) -> Self {
        self.where_(field, Comparator::Equal, value)
    }

    pub fn and_where(
        self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
    ) -> Self {
        self.push_where(field, comparator, value, Conjunction::And)
    }

    pub fn or_where(
        self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
    ) -> Self {
        self.push_where(field, comparator, value, Conjunction::Or)
    }

    pub fn xor_where(
        self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
    ) -> Self {
        self.push_where(field, comparator, value, Conjunction::Xor)
    }

    pub fn not_where(
        self,
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
    ) -> Self {
        self.push_where(field, comparator, value, Conjunction::Not)
    }

    /// Constraint from untyped parts, e.g. `("age", ">=", 18, "AND")`
    pub fn try_where(
        mut self,
        field: &str,
        comparator: &str,
        value: impl Into<ConstraintValue>,
        conjunction: &str,
    ) -> Result<Self, BuildError> {
        let constraint = Constraint::from_parts(field, comparator, value, conjunction)?;
        self.base.internal_where(vec![constraint])?;
        Ok(self)
    }

    // ========================================================================
    // Shaping
    // ========================================================================

    pub fn limit(mut self, limit: usize) -> Self {
        self.base.limit(limit);
        self
    }

    pub fn first(self) -> Self {
        self.limit(1)
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base
            .group_by(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.base.order_by(field, order);
        self
    }

    pub fn map(mut self, shape: ResponseShape) -> Self {
        self.base.map(shape);
        self
    }

    /// Name the current Bag; see [`EndpointRef::Alias`](crate::EndpointRef::Alias)
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.base.set(alias);
        self
    }

    pub fn get(&self, alias: &str) -> Result<&Bag, BuildError> {
        self.base.get(alias)
    }

    pub fn bag(&self) -> Option<&Bag> {
        self.base.bag()
    }

    pub fn bags(&self) -> &[Bag] {
        self.base.bags()
    }

    pub fn into_bags(self) -> Vec<Bag> {
        self.base.into_bags()
    }

    /// Consume the builder, returning the Bag currently being built
    pub fn build(self) -> Result<Bag, BuildError> {
        self.base.into_bags().pop().ok_or(BuildError::NoBag)
    }

    // ========================================================================
    // Translation
    // ========================================================================

    /// Validate and translate the current Bag
    pub fn get_script(&self, processor: &dyn Processor) -> QueryResult<Command> {
        let bag = self.base.bag().ok_or(BuildError::NoBag)?;
        processor.process(bag)
    }

    /// Validate and translate every chained Bag
    pub fn get_scripts(&self, processor: &dyn Processor) -> QueryResult<Vec<Command>> {
        if self.base.bags().is_empty() {
            return Err(BuildError::NoBag.into());
        }
        processor.process_all(self.base.bags())
    }
}
