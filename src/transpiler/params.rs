//! Parameter collection for one compilation.

use crate::ast::Scalar;
use crate::transpiler::traits::SqlGenerator;
use serde::ser::{Serialize, Serializer};

/// A bound parameter: `p{index}` and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: Scalar,
}

/// Parameters of a compiled statement, in allocation order.
///
/// Allocation order equals the order placeholders appear in the SQL text,
/// so positional drivers can bind by iterating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<BoundParam>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.entries.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundParam> {
        self.entries.iter()
    }

    fn push(&mut self, name: String, value: Scalar) {
        self.entries.push(BoundParam { name, value });
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|p| (&p.name, &p.value)))
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a BoundParam;
    type IntoIter = std::slice::Iter<'a, BoundParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Mutable build state threaded through one compilation.
pub struct ParamContext {
    generator: Box<dyn SqlGenerator>,
    /// Index of the next parameter.
    pub index: usize,
    pub parameters: Parameters,
}

impl ParamContext {
    pub fn new(generator: Box<dyn SqlGenerator>) -> Self {
        Self {
            generator,
            index: 0,
            parameters: Parameters::new(),
        }
    }

    /// Bind a value and return the placeholder for it.
    pub fn add_param(&mut self, value: Scalar) -> String {
        let placeholder = self.generator.placeholder(self.index);
        self.parameters.push(format!("p{}", self.index), value);
        self.index += 1;
        placeholder
    }

    pub fn generator(&self) -> &dyn SqlGenerator {
        self.generator.as_ref()
    }

    pub fn into_parameters(self) -> Parameters {
        self.parameters
    }
}
