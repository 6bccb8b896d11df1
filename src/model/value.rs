use std::fmt;

/// Semantic type of a declared schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Int,
    Bool,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// An observable attribute value of a component or connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Returns the semantic kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Float(_) => FieldKind::Float,
            Self::Int(_) => FieldKind::Int,
            Self::Bool(_) => FieldKind::Bool,
            Self::Text(_) => FieldKind::Text,
        }
    }

    /// Returns the value as `f64` for numeric kinds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Default value for a field of the given kind.
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Float => Self::Float(0.0),
            FieldKind::Int => Self::Int(0),
            FieldKind::Bool => Self::Bool(false),
            FieldKind::Text => Self::Text(String::new()),
        }
    }
}

/// Renders the value as a CSV cell. Floats use the shortest text that parses
/// back to the same `f64`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::from(1.5).kind(), FieldKind::Float);
        assert_eq!(Value::from(3_i64).kind(), FieldKind::Int);
        assert_eq!(Value::from(true).kind(), FieldKind::Bool);
        assert_eq!(Value::from("x").kind(), FieldKind::Text);
    }

    #[test]
    fn float_cells_round_trip() {
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(0.00004).to_string(), "0.00004");
        assert_eq!(Value::Float(-0.00001).to_string(), "-0.00001");
        for v in [1.0 / 3.0, 12.939_2, 1e-12, 55.007_7] {
            assert_eq!(Value::Float(v).to_string().parse::<f64>().unwrap(), v);
        }
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn int_widens_to_f64() {
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
