//! Named, ordered sets of field rules.

use crate::validation::rules::FieldRule;

/// Validation rules for one operation.
///
/// Fields are checked in definition order. There is no way to add or remove
/// a field once the schema has been built.
#[derive(Debug, Clone)]
pub struct Schema {
    operation: &'static str,
    fields: Vec<(&'static str, FieldRule)>,
}

impl Schema {
    pub fn builder(operation: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            operation,
            fields: Vec::new(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (*name, rule))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub struct SchemaBuilder {
    operation: &'static str,
    fields: Vec<(&'static str, FieldRule)>,
}

impl SchemaBuilder {
    /// Append a field. Redefining a name replaces the earlier rule in place.
    pub fn field(mut self, name: &'static str, rule: FieldRule) -> Self {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            operation: self.operation,
            fields: self.fields,
        }
    }
}
