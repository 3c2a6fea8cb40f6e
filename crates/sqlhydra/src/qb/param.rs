//! Positional argument accumulation.

use crate::dialect::Dialect;
use crate::value::Value;

/// Ordered statement arguments.
///
/// Every pushed value immediately yields its placeholder for the target dialect, so a
/// statement's text and argument list are produced in the same pass and never need
/// renumbering afterwards.
#[derive(Clone, Debug)]
pub struct ParamList {
    dialect: Dialect,
    values: Vec<Value>,
}

impl ParamList {
    /// Create an empty list for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    /// Add a value and return its placeholder.
    pub fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    /// Add several values and return their comma-separated placeholders.
    pub fn push_all(&mut self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.push(v.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take the collected values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_is_global() {
        let mut params = ParamList::new(Dialect::Pgsql);
        assert_eq!(params.push(Value::Int(1)), "$1");
        assert_eq!(params.push_all(&[Value::Int(2), Value::Int(3)]), "$2, $3");
        assert_eq!(params.len(), 3);

        let mut params = ParamList::new(Dialect::Mssql);
        params.push(Value::Null);
        assert_eq!(params.push(Value::Null), "@p2");
    }
}
