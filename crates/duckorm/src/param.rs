//! Ordered parameter collection used while rendering statements.

use crate::dialect::Dialect;
use crate::value::Value;

/// Parameters collected during rendering, in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.params.len()
    }

    /// Add a parameter and return the dialect placeholder that refers to it.
    pub fn bind(&mut self, value: Value, dialect: &Dialect) -> String {
        let idx = self.push(value);
        dialect.placeholder(idx)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.params
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.params
    }
}
