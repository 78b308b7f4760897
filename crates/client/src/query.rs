//! Query builder.
//!
//! A [`Query`] is an immutable description of a collection read. Every
//! builder method returns a new query; nothing is sent until the query is
//! handed to [`Batch::get`](crate::Batch::get) or
//! [`Database::run_query`](crate::Database::run_query), which pass the
//! [`StructuredQuery`] descriptor to the service.

use firestore_core::{Error, FieldPath, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Array field contains the value
    ArrayContains,
    /// Field equals one of the values
    In,
    /// Array field contains any of the values
    ArrayContainsAny,
    /// Field equals none of the values
    NotIn,
}

impl Operator {
    fn takes_array(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::ArrayContainsAny | Operator::NotIn
        )
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "<" | "lt" => Ok(Operator::LessThan),
            "<=" | "lte" => Ok(Operator::LessThanOrEqual),
            "=" | "==" | "eq" | "eql" | "is" => Ok(Operator::Equal),
            "!=" | "ne" => Ok(Operator::NotEqual),
            ">" | "gt" => Ok(Operator::GreaterThan),
            ">=" | "gte" => Ok(Operator::GreaterThanOrEqual),
            "array_contains" | "array-contains" => Ok(Operator::ArrayContains),
            "in" => Ok(Operator::In),
            "array_contains_any" | "array-contains-any" => Ok(Operator::ArrayContainsAny),
            "not_in" | "not-in" => Ok(Operator::NotIn),
            other => Err(Error::invalid_argument(format!(
                "unknown query operator {other:?}"
            ))),
        }
    }
}

/// Operator of a filter that takes no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnaryOperator {
    /// Field is null
    IsNull,
    /// Field is NaN
    IsNan,
    /// Field is not null
    IsNotNull,
    /// Field is not NaN
    IsNotNan,
}

/// A single query filter. Filters in one query are combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    /// Compare a field to a value
    Field {
        /// Field compared
        field: FieldPath,
        /// Operator
        op: Operator,
        /// Operand
        value: Value,
    },
    /// Null/NaN test
    Unary {
        /// Field tested
        field: FieldPath,
        /// Operator
        op: UnaryOperator,
    },
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Ascending),
            "desc" | "descending" => Ok(Direction::Descending),
            other => Err(Error::invalid_argument(format!(
                "unknown sort direction {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "asc"),
            Direction::Descending => write!(f, "desc"),
        }
    }
}

/// Sort order on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Field sorted on
    pub field: FieldPath,
    /// Direction
    pub direction: Direction,
}

/// A position in the result order, given as values of the ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// One value per ordered field, in order
    pub values: Vec<Value>,
    /// Whether the position is just before the given values
    pub before: bool,
}

/// Collection the query reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    /// Collection id
    pub collection_id: String,
    /// Whether to include collections with the same id at any depth
    pub all_descendants: bool,
}

/// Query descriptor sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    /// Projection; `None` returns whole documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<FieldPath>>,
    /// Source collection
    pub from: Vec<CollectionSelector>,
    /// Filters, combined with AND
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Sort orders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    /// Start position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Cursor>,
    /// End position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<Cursor>,
    /// Results to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Maximum results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A composed query over one collection (or collection group).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    parent: String,
    collection_id: String,
    all_descendants: bool,
    select: Vec<FieldPath>,
    filters: Vec<Filter>,
    orders: Vec<Order>,
    offset: Option<u32>,
    limit: Option<u32>,
    start_at: Option<Cursor>,
    end_at: Option<Cursor>,
}

impl Query {
    /// A query over `collection_id` below the full resource name `parent`.
    pub fn new(
        parent: impl Into<String>,
        collection_id: impl Into<String>,
        all_descendants: bool,
    ) -> Self {
        Self {
            parent: parent.into(),
            collection_id: collection_id.into(),
            all_descendants,
            select: Vec::new(),
            filters: Vec::new(),
            orders: Vec::new(),
            offset: None,
            limit: None,
            start_at: None,
            end_at: None,
        }
    }

    /// Full resource name the query runs below.
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// The collection id queried.
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Restricts the returned fields. Calling it again replaces the projection.
    pub fn select<I, S>(&self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let select = fields
            .into_iter()
            .map(|field| FieldPath::parse(field.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut query = self.clone();
        query.select = select;
        Ok(query)
    }

    /// Adds a filter. `== null` and `== NaN` (and their `!=` forms) become
    /// unary filters.
    pub fn filter(&self, field: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        let field = FieldPath::parse(field)?;
        let op: Operator = op.parse()?;
        let value = value.into();

        if value.contains_sentinel() {
            return Err(Error::invalid_argument(format!(
                "sentinel values cannot be used in a filter on {field}"
            )));
        }

        let is_null = matches!(value, Value::Null);
        let filter = if is_null || value.is_nan() {
            let unary = match (op, is_null) {
                (Operator::Equal, true) => UnaryOperator::IsNull,
                (Operator::NotEqual, true) => UnaryOperator::IsNotNull,
                (Operator::Equal, false) => UnaryOperator::IsNan,
                (Operator::NotEqual, false) => UnaryOperator::IsNotNan,
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "null and NaN only support == and != (field {field})"
                    )))
                }
            };
            Filter::Unary { field, op: unary }
        } else if op.takes_array() && !matches!(value, Value::Array(_)) {
            return Err(Error::invalid_argument(format!(
                "operator {op:?} requires an array value (field {field})"
            )));
        } else {
            Filter::Field { field, op, value }
        };

        let mut query = self.clone();
        query.filters.push(filter);
        Ok(query)
    }

    /// Adds a sort order.
    pub fn order(&self, field: &str, direction: Direction) -> Result<Self> {
        if self.start_at.is_some() || self.end_at.is_some() {
            return Err(Error::invalid_argument(
                "cannot add an order after setting a cursor",
            ));
        }
        let mut query = self.clone();
        query.orders.push(Order {
            field: FieldPath::parse(field)?,
            direction,
        });
        Ok(query)
    }

    /// Skips the first `offset` results.
    pub fn offset(&self, offset: u32) -> Self {
        let mut query = self.clone();
        query.offset = Some(offset);
        query
    }

    /// Returns at most `limit` results.
    pub fn limit(&self, limit: u32) -> Self {
        let mut query = self.clone();
        query.limit = Some(limit);
        query
    }

    /// Starts at the given ordered-field values (inclusive).
    pub fn start_at<V: Into<Value>>(&self, values: Vec<V>) -> Self {
        self.with_start(values, true)
    }

    /// Starts after the given ordered-field values.
    pub fn start_after<V: Into<Value>>(&self, values: Vec<V>) -> Self {
        self.with_start(values, false)
    }

    /// Ends before the given ordered-field values.
    pub fn end_before<V: Into<Value>>(&self, values: Vec<V>) -> Self {
        self.with_end(values, true)
    }

    /// Ends at the given ordered-field values (inclusive).
    pub fn end_at<V: Into<Value>>(&self, values: Vec<V>) -> Self {
        self.with_end(values, false)
    }

    fn with_start<V: Into<Value>>(&self, values: Vec<V>, before: bool) -> Self {
        let mut query = self.clone();
        query.start_at = Some(Cursor {
            values: values.into_iter().map(Into::into).collect(),
            before,
        });
        query
    }

    fn with_end<V: Into<Value>>(&self, values: Vec<V>, before: bool) -> Self {
        let mut query = self.clone();
        query.end_at = Some(Cursor {
            values: values.into_iter().map(Into::into).collect(),
            before,
        });
        query
    }

    /// Builds the service descriptor, validating cursors against orders.
    pub fn to_structured_query(&self) -> Result<StructuredQuery> {
        for cursor in [&self.start_at, &self.end_at].into_iter().flatten() {
            if cursor.values.is_empty() {
                return Err(Error::invalid_argument("cursor must have at least one value"));
            }
            if cursor.values.len() > self.orders.len() {
                return Err(Error::invalid_argument(format!(
                    "cursor has {} values but the query has {} orders",
                    cursor.values.len(),
                    self.orders.len()
                )));
            }
        }

        Ok(StructuredQuery {
            select: (!self.select.is_empty()).then(|| self.select.clone()),
            from: vec![CollectionSelector {
                collection_id: self.collection_id.clone(),
                all_descendants: self.all_descendants,
            }],
            filters: self.filters.clone(),
            order_by: self.orders.clone(),
            start_at: self.start_at.clone(),
            end_at: self.end_at.clone(),
            offset: self.offset,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firestore_core::DocumentData;

    fn cities() -> Query {
        Query::new("projects/p/databases/(default)/documents", "cities", false)
    }

    #[test]
    fn test_operator_aliases() {
        assert_eq!("<".parse::<Operator>().unwrap(), Operator::LessThan);
        assert_eq!("gte".parse::<Operator>().unwrap(), Operator::GreaterThanOrEqual);
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
        assert_eq!("eql".parse::<Operator>().unwrap(), Operator::Equal);
        assert_eq!(
            "array-contains".parse::<Operator>().unwrap(),
            Operator::ArrayContains
        );
        assert!("~=".parse::<Operator>().is_err());
    }

    #[test]
    fn test_fluent_chain_is_immutable() {
        let base = cities();
        let query = base
            .filter("population", ">", 1_000_000i64)
            .unwrap()
            .order("population", Direction::Descending)
            .unwrap()
            .limit(10);

        assert_eq!(base.to_structured_query().unwrap().limit, None);

        let structured = query.to_structured_query().unwrap();
        assert_eq!(structured.limit, Some(10));
        assert_eq!(structured.filters.len(), 1);
        assert_eq!(structured.order_by[0].direction, Direction::Descending);
        assert_eq!(structured.from[0].collection_id, "cities");
    }

    #[test]
    fn test_null_and_nan_filters() {
        let query = cities()
            .filter("mayor", "==", Value::Null)
            .unwrap()
            .filter("score", "!=", f64::NAN)
            .unwrap();
        let structured = query.to_structured_query().unwrap();
        assert!(matches!(
            structured.filters[0],
            Filter::Unary { op: UnaryOperator::IsNull, .. }
        ));
        assert!(matches!(
            structured.filters[1],
            Filter::Unary { op: UnaryOperator::IsNotNan, .. }
        ));
        assert!(cities().filter("mayor", "<", Value::Null).is_err());
    }

    #[test]
    fn test_nested_sentinels_rejected() {
        assert!(cities().filter("updated", "==", Value::ServerTimestamp).is_err());
        assert!(cities()
            .filter("tags", "in", vec![Value::ServerTimestamp])
            .is_err());
        let mut nested = DocumentData::new();
        nested.insert("gone".to_string(), Value::Delete);
        assert!(cities()
            .filter("meta", "==", Value::Array(vec![Value::Map(nested)]))
            .is_err());
    }

    #[test]
    fn test_in_requires_array() {
        assert!(cities().filter("state", "in", "CA").is_err());
        assert!(cities().filter("state", "in", vec!["CA", "NY"]).is_ok());
    }

    #[test]
    fn test_cursor_validation() {
        let no_order = cities().start_at(vec!["a"]);
        assert!(no_order.to_structured_query().is_err());

        let ordered = cities()
            .order("name", Direction::Ascending)
            .unwrap()
            .start_after(vec!["Denver"])
            .end_at(vec!["Seattle"]);
        let structured = ordered.to_structured_query().unwrap();
        assert!(!structured.start_at.unwrap().before);
        assert!(!structured.end_at.unwrap().before);

        assert!(ordered.order("state", Direction::Ascending).is_err());
    }

    #[test]
    fn test_select() {
        let query = cities().select(["name", "address.state"]).unwrap();
        let structured = query.to_structured_query().unwrap();
        assert_eq!(structured.select.unwrap().len(), 2);
        assert!(cities().select(["a..b"]).is_err());
    }
}
