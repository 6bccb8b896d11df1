//! Declared per-type field schemas used to validate and serialize snapshots.

use indexmap::IndexMap;

use super::value::{FieldKind, Value};
use crate::error::{SimError, SimResult};

/// Column names the data log writes ahead of schema fields.
pub const RESERVED_FIELDS: &[&str] = &["tick", "id", "source", "target"];

/// One named, typed field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }
}

/// Ordered list of fields observable on every entity of one type.
///
/// Column order in the sink follows declaration order.
///
/// # Examples
///
/// ```
/// use grid_sim::model::{Field, Schema};
///
/// let schema = Schema::new(vec![Field::float("input_kw"), Field::float("output_kw")]).unwrap();
/// assert_eq!(schema.names().collect::<Vec<_>>(), vec!["input_kw", "output_kw"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Creates a schema from an ordered field list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for duplicate field names or names that
    /// collide with the log's leading columns.
    pub fn new(fields: Vec<Field>) -> SimResult<Self> {
        for (i, field) in fields.iter().enumerate() {
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(SimError::invalid(
                    "schema",
                    format!("field name \"{}\" is reserved", field.name),
                ));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SimError::invalid(
                    "schema",
                    format!("duplicate field \"{}\"", field.name),
                ));
            }
        }
        Ok(Self { fields })
    }

    /// An empty schema (entity with no observable attributes).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds an attribute bag holding the zero value of every field.
    pub fn defaults(&self) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), Value::zero(f.kind)))
            .collect()
    }

    /// Checks that `attrs` carries exactly the declared fields with their declared kinds.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Schema` naming `entity` on the first mismatch.
    pub fn validate(&self, entity: &str, attrs: &IndexMap<String, Value>) -> SimResult<()> {
        for field in &self.fields {
            match attrs.get(&field.name) {
                None => {
                    return Err(SimError::schema(
                        entity,
                        format!("missing field \"{}\"", field.name),
                    ));
                }
                Some(value) if value.kind() != field.kind => {
                    return Err(SimError::schema(
                        entity,
                        format!(
                            "field \"{}\" is {}, declared {}",
                            field.name,
                            value.kind(),
                            field.kind
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = attrs
            .keys()
            .find(|k| !self.fields.iter().any(|f| &f.name == *k))
        {
            return Err(SimError::schema(
                entity,
                format!("undeclared field \"{extra}\""),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_schema() -> Schema {
        Schema::new(vec![Field::float("input_kw"), Field::int("count")]).unwrap()
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Schema::new(vec![Field::float("a"), Field::int("a")]).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn rejects_reserved_names() {
        assert!(Schema::new(vec![Field::int("tick")]).is_err());
        assert!(Schema::new(vec![Field::text("source")]).is_err());
    }

    #[test]
    fn defaults_follow_declaration_order() {
        let attrs = stage_schema().defaults();
        let keys: Vec<_> = attrs.keys().cloned().collect();
        assert_eq!(keys, vec!["input_kw", "count"]);
        assert_eq!(attrs["count"], Value::Int(0));
    }

    #[test]
    fn validate_accepts_matching_attrs() {
        let schema = stage_schema();
        assert!(schema.validate("x", &schema.defaults()).is_ok());
    }

    #[test]
    fn validate_rejects_missing_wrong_kind_and_extra() {
        let schema = stage_schema();

        let mut missing = schema.defaults();
        missing.shift_remove("count");
        assert!(matches!(
            schema.validate("x", &missing),
            Err(SimError::Schema { .. })
        ));

        let mut wrong = schema.defaults();
        wrong.insert("count".into(), Value::Float(1.0));
        assert!(schema.validate("x", &wrong).is_err());

        let mut extra = schema.defaults();
        extra.insert("bogus".into(), Value::Bool(true));
        let err = schema.validate("x", &extra).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
