//! The backend-neutral command model.
//!
//! A [`Bag`] describes exactly one graph operation (create, retrieve,
//! update or delete) together with its constraints and output shaping.
//! Bags nest: an edge endpoint or a constraint value may itself be a
//! Bag that processors resolve into a sub-expression.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Property map of a record or an update, in insertion order
pub type Properties = serde_json::Map<String, Value>;

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of graph element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementType {
    #[default]
    Vertex,
    Edge,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Vertex => "VERTEX",
            ElementType::Edge => "EDGE",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERTEX" => Ok(ElementType::Vertex),
            "EDGE" => Ok(ElementType::Edge),
            _ => Err(BuildError::InvalidElementType(s.to_string())),
        }
    }
}

/// Comparison applied by a [`Constraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Comparator {
    Equal,
    Lt,
    Gt,
    Ge,
    Le,
    Ne,
    Without,
    In,
}

impl Comparator {
    pub const ALL: [Comparator; 8] = [
        Comparator::Equal,
        Comparator::Lt,
        Comparator::Gt,
        Comparator::Ge,
        Comparator::Le,
        Comparator::Ne,
        Comparator::Without,
        Comparator::In,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equal => "EQUAL",
            Comparator::Lt => "LT",
            Comparator::Gt => "GT",
            Comparator::Ge => "GE",
            Comparator::Le => "LE",
            Comparator::Ne => "NE",
            Comparator::Without => "WITHOUT",
            Comparator::In => "IN",
        }
    }
}

impl FromStr for Comparator {
    type Err = BuildError;

    /// Accepts the enum names (`EQUAL`, `LT`, ...) and the usual symbols.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let comparator = match normalized.as_str() {
            "EQUAL" | "EQ" | "=" | "==" => Comparator::Equal,
            "LT" | "<" => Comparator::Lt,
            "GT" | ">" => Comparator::Gt,
            "GE" | ">=" => Comparator::Ge,
            "LE" | "<=" => Comparator::Le,
            "NE" | "<>" | "!=" => Comparator::Ne,
            "WITHOUT" | "NOT IN" => Comparator::Without,
            "IN" => Comparator::In,
            _ => return Err(BuildError::InvalidComparator(s.to_string())),
        };
        Ok(comparator)
    }
}

/// How a constraint joins the constraint before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
    Xor,
    Not,
}

impl FromStr for Conjunction {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Conjunction::And),
            "OR" => Ok(Conjunction::Or),
            "XOR" => Ok(Conjunction::Xor),
            "NOT" | "AND NOT" => Ok(Conjunction::Not),
            _ => Err(BuildError::InvalidConjunction(s.to_string())),
        }
    }
}

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Output shape requested from the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseShape {
    #[default]
    Set,
    Path,
    Tree,
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseShape::Set => write!(f, "SET"),
            ResponseShape::Path => write!(f, "PATH"),
            ResponseShape::Tree => write!(f, "TREE"),
        }
    }
}

/// The operation a Bag performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Retrieve,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// What a constraint compares against.
///
/// `Type`, `Label` and `Id` select the operation target rather than
/// filtering on a stored property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Property(String),
    Type,
    Label,
    Id,
}

impl FieldRef {
    /// Parse a field name, recognising the reserved element tags
    pub fn parse(name: &str) -> Self {
        match name {
            "ELEMENT_TYPE" => FieldRef::Type,
            "ELEMENT_LABEL" => FieldRef::Label,
            "ELEMENT_ID" => FieldRef::Id,
            other => FieldRef::Property(other.to_string()),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Property(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::Property(name)
    }
}

/// Right-hand side of a constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintValue {
    Literal(Value),
    /// Resolved to a parenthesised sub-query at translation time
    Embedded(Box<Bag>),
}

impl ConstraintValue {
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            ConstraintValue::Literal(value) => Some(value),
            ConstraintValue::Embedded(_) => None,
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ConstraintValue {
                fn from(value: $ty) -> Self {
                    ConstraintValue::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(&str, String, bool, i32, i64, u32, u64, f64, Vec<Value>);

impl From<Value> for ConstraintValue {
    fn from(value: Value) -> Self {
        ConstraintValue::Literal(value)
    }
}

impl From<Bag> for ConstraintValue {
    fn from(bag: Bag) -> Self {
        ConstraintValue::Embedded(Box::new(bag))
    }
}

/// One `where` entry: `field comparator value`, joined to the previous
/// entry by `conjunction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub field: FieldRef,
    pub comparator: Comparator,
    pub value: ConstraintValue,
    #[serde(default)]
    pub conjunction: Conjunction,
}

impl Constraint {
    pub fn new(
        field: impl Into<FieldRef>,
        comparator: Comparator,
        value: impl Into<ConstraintValue>,
        conjunction: Conjunction,
    ) -> Self {
        Self {
            field: field.into(),
            comparator,
            value: value.into(),
            conjunction,
        }
    }

    /// Element kind chosen by a `Type` selector; only `EQUAL` selects
    pub(crate) fn selected_element_type(&self) -> Result<ElementType, BuildError> {
        if self.comparator != Comparator::Equal {
            return Err(BuildError::InvalidElementTypeComparator(
                self.comparator.as_str().to_string(),
            ));
        }
        match &self.value {
            ConstraintValue::Literal(Value::String(s)) => s.parse(),
            other => Err(BuildError::InvalidElementType(format!("{other:?}"))),
        }
    }

    /// Build from untyped parts, failing on unknown comparator or conjunction
    pub fn from_parts(
        field: &str,
        comparator: &str,
        value: impl Into<ConstraintValue>,
        conjunction: &str,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            field: FieldRef::parse(field),
            comparator: comparator.parse()?,
            value: value.into(),
            conjunction: conjunction.parse()?,
        })
    }

    /// Whether this entry names the target instead of filtering
    pub fn is_selector(&self) -> bool {
        !matches!(self.field, FieldRef::Property(_))
    }
}

impl TryFrom<&[Value]> for Constraint {
    type Error = BuildError;

    /// Parse a `[field, comparator, value, conjunction]` array.
    fn try_from(parts: &[Value]) -> Result<Self, Self::Error> {
        let [field, comparator, value, conjunction] = parts else {
            return Err(BuildError::MalformedConstraint {
                expected: 4,
                actual: parts.len(),
            });
        };

        let field = field
            .as_str()
            .ok_or_else(|| BuildError::InvalidField(field.to_string()))?;
        let comparator = comparator
            .as_str()
            .ok_or_else(|| BuildError::InvalidComparator(comparator.to_string()))?;
        let conjunction = conjunction
            .as_str()
            .ok_or_else(|| BuildError::InvalidConjunction(conjunction.to_string()))?;

        Constraint::from_parts(field, comparator, value.clone(), conjunction)
    }
}

// ============================================================================
// Records
// ============================================================================

/// Where an edge starts or ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRef {
    /// A record id known up front
    Literal(String),
    /// A retrieve resolved when the edge is created
    Embedded(Box<Bag>),
    /// A Bag named with [`BaseBuilder::set`](crate::builder::BaseBuilder::set)
    /// earlier in the same batch
    Alias(String),
}

impl EndpointRef {
    pub fn alias(name: impl Into<String>) -> Self {
        EndpointRef::Alias(name.into())
    }
}

impl From<&str> for EndpointRef {
    fn from(id: &str) -> Self {
        EndpointRef::Literal(id.to_string())
    }
}

impl From<String> for EndpointRef {
    fn from(id: String) -> Self {
        EndpointRef::Literal(id)
    }
}

impl From<Bag> for EndpointRef {
    fn from(bag: Bag) -> Self {
        EndpointRef::Embedded(Box::new(bag))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl VertexRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            properties: Properties::new(),
        }
    }

    pub fn unlabeled() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(default)]
    pub label: Option<String>,
    /// Out vertex
    #[serde(default)]
    pub from: Option<EndpointRef>,
    /// In vertex
    #[serde(default)]
    pub to: Option<EndpointRef>,
    #[serde(default)]
    pub properties: Properties,
}

impl EdgeRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Edge of the dialect's default class or type
    pub fn unlabeled() -> Self {
        Self::default()
    }

    pub fn from(mut self, endpoint: impl Into<EndpointRef>) -> Self {
        self.from = Some(endpoint.into());
        self
    }

    pub fn to(mut self, endpoint: impl Into<EndpointRef>) -> Self {
        self.to = Some(endpoint.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A record to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Vertex(VertexRecord),
    Edge(EdgeRecord),
}

impl Record {
    pub fn element_type(&self) -> ElementType {
        match self {
            Record::Vertex(_) => ElementType::Vertex,
            Record::Edge(_) => ElementType::Edge,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Record::Vertex(v) => v.label.as_deref(),
            Record::Edge(e) => e.label.as_deref(),
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Record::Vertex(v) => &v.properties,
            Record::Edge(e) => &e.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Record::Vertex(v) => &mut v.properties,
            Record::Edge(e) => &mut e.properties,
        }
    }

    pub(crate) fn label_mut(&mut self) -> &mut Option<String> {
        match self {
            Record::Vertex(v) => &mut v.label,
            Record::Edge(e) => &mut e.label,
        }
    }
}

impl From<VertexRecord> for Record {
    fn from(record: VertexRecord) -> Self {
        Record::Vertex(record)
    }
}

impl From<EdgeRecord> for Record {
    fn from(record: EdgeRecord) -> Self {
        Record::Edge(record)
    }
}

// ============================================================================
// Bag
// ============================================================================

/// One backend-neutral graph operation.
///
/// Created empty, filled through a [`Builder`](crate::builder::Builder),
/// validated right before translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bag {
    pub create: Option<Vec<Record>>,
    /// Projected fields; empty means all fields
    pub retrieve: Option<Vec<String>>,
    /// Properties merged into every matching record
    pub update: Option<Properties>,
    pub delete: bool,
    #[serde(rename = "where")]
    pub constraints: Vec<Constraint>,
    pub limit: Option<usize>,
    pub group_by: Vec<String>,
    pub order_by: Vec<(String, Order)>,
    pub map: ResponseShape,
    /// Name other bags in the same batch can refer to
    pub alias: Option<String>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation this bag declares, in create/retrieve/update/delete order
    pub fn operations(&self) -> Vec<Operation> {
        let mut operations = Vec::new();
        if self.create.is_some() {
            operations.push(Operation::Create);
        }
        if self.retrieve.is_some() {
            operations.push(Operation::Retrieve);
        }
        if self.update.is_some() {
            operations.push(Operation::Update);
        }
        if self.delete {
            operations.push(Operation::Delete);
        }
        operations
    }

    /// The first declared operation
    pub fn operation(&self) -> Option<Operation> {
        self.operations().first().copied()
    }

    pub fn is_retrieve(&self) -> bool {
        self.operation() == Some(Operation::Retrieve)
    }

    /// Element kind named by the first `Type` constraint, vertex by default
    pub fn element_type(&self) -> Result<ElementType, BuildError> {
        match self
            .constraints
            .iter()
            .find(|c| c.field == FieldRef::Type)
        {
            Some(constraint) => constraint.selected_element_type(),
            None => Ok(ElementType::Vertex),
        }
    }
}
