use serde::{Deserialize, Serialize};

/// A single bindable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// The right-hand side of a leaf condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl ConditionValue {
    /// Number of parameters this value binds.
    pub fn arity(&self) -> usize {
        match self {
            ConditionValue::Scalar(_) => 1,
            ConditionValue::List(values) => values.len(),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<Scalar> for ConditionValue {
    fn from(v: Scalar) -> Self {
        ConditionValue::Scalar(v)
    }
}

impl From<&str> for ConditionValue {
    fn from(v: &str) -> Self {
        ConditionValue::Scalar(v.into())
    }
}

impl From<i64> for ConditionValue {
    fn from(v: i64) -> Self {
        ConditionValue::Scalar(v.into())
    }
}

impl From<bool> for ConditionValue {
    fn from(v: bool) -> Self {
        ConditionValue::Scalar(v.into())
    }
}

impl From<Vec<Scalar>> for ConditionValue {
    fn from(v: Vec<Scalar>) -> Self {
        ConditionValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_from_json() {
        let v: Scalar = serde_json::from_str("10").unwrap();
        assert_eq!(v, Scalar::Int(10));
        let v: Scalar = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, Scalar::Float(2.5));
        let v: Scalar = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(v, Scalar::Text("active".into()));
        assert!(serde_json::from_str::<Scalar>("null").is_err());
        assert!(serde_json::from_str::<Scalar>("{\"a\":1}").is_err());
    }

    #[test]
    fn test_condition_value_arity() {
        let v: ConditionValue = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(v.arity(), 3);
        let v: ConditionValue = "x".into();
        assert_eq!(v.arity(), 1);
    }
}
