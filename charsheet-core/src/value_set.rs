//! Value sets: named, enumerable collections of typed values.
//!
//! A base set owns its values directly. A compound set is the union of other
//! sets, possibly compound themselves. Each value remembers the id of the
//! set that defined it.

use crate::error::{EngineError, EngineResult};
use crate::id::{ValueId, ValueSetId};
use crate::rulebook::RulebookReference;
use crate::value::{EngineValue, EngineValueType};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Default limit on how deeply compound sets may nest.
pub const DEFAULT_MAX_VALUE_SET_DEPTH: usize = 32;

/// Addresses one value inside a value set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueReference {
    pub value_set_id: ValueSetId,
    pub value_id: ValueId,
}

impl ValueReference {
    pub fn new(value_set_id: impl Into<ValueSetId>, value_id: impl Into<ValueId>) -> Self {
        Self {
            value_set_id: value_set_id.into(),
            value_id: value_id.into(),
        }
    }
}

impl fmt::Display for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value_set_id, self.value_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePayload {
    Number(f64),
    Text(String),
}

/// An entry of a value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    /// Set that defined this value.
    pub value_set_id: ValueSetId,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulebook_reference: Option<RulebookReference>,
    /// Variables a sheet gains when this value is chosen.
    #[serde(default)]
    pub variables: Vec<Variable>,
    pub payload: ValuePayload,
}

impl Value {
    pub fn new(value_set_id: impl Into<ValueSetId>, id: impl Into<ValueId>, payload: ValuePayload) -> Self {
        Self {
            id: id.into(),
            value_set_id: value_set_id.into(),
            description: String::new(),
            rulebook_reference: None,
            variables: Vec::new(),
            payload,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_reference(mut self, reference: RulebookReference) -> Self {
        self.rulebook_reference = Some(reference);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn value_type(&self) -> EngineValueType {
        match self.payload {
            ValuePayload::Number(_) => EngineValueType::Number,
            ValuePayload::Text(_) => EngineValueType::Text,
        }
    }

    pub fn number(&self) -> EngineResult<f64> {
        match &self.payload {
            ValuePayload::Number(n) => Ok(*n),
            ValuePayload::Text(_) => Err(EngineError::TypeMismatch {
                expected: EngineValueType::Number,
                found: EngineValueType::Text,
            }),
        }
    }

    pub fn text(&self) -> EngineResult<&str> {
        match &self.payload {
            ValuePayload::Text(s) => Ok(s),
            ValuePayload::Number(_) => Err(EngineError::TypeMismatch {
                expected: EngineValueType::Text,
                found: EngineValueType::Number,
            }),
        }
    }

    pub fn to_engine_value(&self) -> EngineValue {
        match &self.payload {
            ValuePayload::Number(n) => EngineValue::Number(*n),
            ValuePayload::Text(s) => EngineValue::Text(s.clone()),
        }
    }

    pub fn reference(&self) -> ValueReference {
        ValueReference::new(self.value_set_id.clone(), self.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSetMembers {
    Base(Vec<Value>),
    Compound(Vec<ValueSetId>),
}

/// Deserializing folds the members through [`ValueSet::with_value`] and
/// [`ValueSet::with_member`], so stored values are rebound to this set and
/// duplicates collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValueSetFields")]
pub struct ValueSet {
    pub id: ValueSetId,
    pub label: String,
    pub label_singular: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<EngineValueType>,
    members: ValueSetMembers,
}

#[derive(Deserialize)]
struct ValueSetFields {
    id: ValueSetId,
    label: String,
    label_singular: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    value_type: Option<EngineValueType>,
    members: ValueSetMembers,
}

impl From<ValueSetFields> for ValueSet {
    fn from(fields: ValueSetFields) -> Self {
        let empty = match &fields.members {
            ValueSetMembers::Base(_) => ValueSetMembers::Base(Vec::new()),
            ValueSetMembers::Compound(_) => ValueSetMembers::Compound(Vec::new()),
        };
        let mut set = ValueSet::with_members(fields.id, fields.label, empty)
            .with_singular(fields.label_singular)
            .with_description(fields.description);
        set.value_type = fields.value_type;
        match fields.members {
            ValueSetMembers::Base(values) => values.into_iter().fold(set, ValueSet::with_value),
            ValueSetMembers::Compound(ids) => ids.into_iter().fold(set, |set, id| set.with_member(id)),
        }
    }
}

impl ValueSet {
    pub fn base(id: impl Into<ValueSetId>, label: impl Into<String>) -> Self {
        Self::with_members(id, label, ValueSetMembers::Base(Vec::new()))
    }

    pub fn compound(id: impl Into<ValueSetId>, label: impl Into<String>) -> Self {
        Self::with_members(id, label, ValueSetMembers::Compound(Vec::new()))
    }

    fn with_members(id: impl Into<ValueSetId>, label: impl Into<String>, members: ValueSetMembers) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            label_singular: label.clone(),
            label,
            description: String::new(),
            value_type: None,
            members,
        }
    }

    pub fn with_singular(mut self, label_singular: impl Into<String>) -> Self {
        self.label_singular = label_singular.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_value_type(mut self, value_type: EngineValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Add a value to a base set.
    ///
    /// The value is rebound to this set. A value whose id is already present
    /// is ignored, as is any value added to a compound set.
    pub fn with_value(mut self, mut value: Value) -> Self {
        match &mut self.members {
            ValueSetMembers::Base(values) => {
                if values.iter().any(|v| v.id == value.id) {
                    debug!(set = %self.id, value = %value.id, "Ignoring duplicate value");
                } else {
                    value.value_set_id = self.id.clone();
                    values.push(value);
                }
            }
            ValueSetMembers::Compound(_) => {
                debug!(set = %self.id, "Compound value sets cannot hold values directly");
            }
        }
        self
    }

    /// Add a member set to a compound set. Ignored for base sets.
    pub fn with_member(mut self, member: impl Into<ValueSetId>) -> Self {
        if let ValueSetMembers::Compound(ids) = &mut self.members {
            let member = member.into();
            if !ids.contains(&member) {
                ids.push(member);
            }
        }
        self
    }

    pub fn members(&self) -> &ValueSetMembers {
        &self.members
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.members, ValueSetMembers::Compound(_))
    }
}

/// All value sets of a rulebook, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ValueSetRegistry {
    sets: HashMap<ValueSetId, ValueSet>,
}

impl ValueSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set, returning any set it replaced.
    pub fn insert(&mut self, set: ValueSet) -> Option<ValueSet> {
        self.sets.insert(set.id.clone(), set)
    }

    pub fn get(&self, id: &ValueSetId) -> EngineResult<&ValueSet> {
        self.sets
            .get(id)
            .ok_or_else(|| EngineError::UnknownValueSet(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueSet> {
        self.sets.values()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Every value reachable from `id`, with compound sets flattened.
    pub fn resolve_set(&self, id: &ValueSetId) -> EngineResult<Vec<&Value>> {
        self.resolve_set_limited(id, DEFAULT_MAX_VALUE_SET_DEPTH)
    }

    /// Like [`resolve_set`](Self::resolve_set) with an explicit nesting limit.
    ///
    /// Values are returned in declaration order. When two member sets both
    /// contain a value id, the first one reached wins.
    pub fn resolve_set_limited(&self, id: &ValueSetId, max_depth: usize) -> EngineResult<Vec<&Value>> {
        let mut stack = Vec::new();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect(id, max_depth, &mut stack, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect<'a>(
        &'a self,
        id: &ValueSetId,
        max_depth: usize,
        stack: &mut Vec<ValueSetId>,
        seen: &mut HashSet<&'a ValueId>,
        out: &mut Vec<&'a Value>,
    ) -> EngineResult<()> {
        if stack.contains(id) {
            return Err(EngineError::CyclicValueSet(id.clone()));
        }
        let set = self.get(id)?;
        match &set.members {
            ValueSetMembers::Base(values) => {
                for value in values {
                    if seen.insert(&value.id) {
                        out.push(value);
                    }
                }
            }
            ValueSetMembers::Compound(members) => {
                if stack.len() >= max_depth {
                    return Err(EngineError::DepthExceeded {
                        what: "value set",
                        limit: max_depth,
                    });
                }
                stack.push(id.clone());
                for member in members {
                    if let Err(e) = self.collect(member, max_depth, stack, seen, out) {
                        stack.pop();
                        return Err(e);
                    }
                }
                stack.pop();
            }
        }
        Ok(())
    }

    pub fn lookup(&self, reference: &ValueReference) -> EngineResult<&Value> {
        self.lookup_limited(reference, DEFAULT_MAX_VALUE_SET_DEPTH)
    }

    pub fn lookup_limited(&self, reference: &ValueReference, max_depth: usize) -> EngineResult<&Value> {
        self.resolve_set_limited(&reference.value_set_id, max_depth)?
            .into_iter()
            .find(|v| v.id == reference.value_id)
            .ok_or_else(|| EngineError::UnknownValue {
                value_set_id: reference.value_set_id.clone(),
                value_id: reference.value_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(id: &str, n: f64) -> Value {
        Value::new("", id, ValuePayload::Number(n))
    }

    fn registry() -> ValueSetRegistry {
        let mut registry = ValueSetRegistry::new();
        registry.insert(
            ValueSet::base("martial", "Martial Weapons")
                .with_value(number("longsword", 8.0))
                .with_value(number("greataxe", 12.0)),
        );
        registry.insert(
            ValueSet::base("simple", "Simple Weapons")
                .with_value(number("dagger", 4.0))
                .with_value(number("club", 4.0)),
        );
        registry.insert(
            ValueSet::compound("weapons", "Weapons")
                .with_member("martial")
                .with_member("simple"),
        );
        registry
    }

    #[test]
    fn test_values_remember_their_set() {
        let registry = registry();
        let value = registry
            .lookup(&ValueReference::new("weapons", "dagger"))
            .unwrap();
        assert_eq!(value.value_set_id, ValueSetId::new("simple"));
        assert_eq!(value.number(), Ok(4.0));
    }

    #[test]
    fn test_compound_flattens_in_order() {
        let registry = registry();
        let ids: Vec<_> = registry
            .resolve_set(&ValueSetId::new("weapons"))
            .unwrap()
            .into_iter()
            .map(|v| v.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["longsword", "greataxe", "dagger", "club"]);
    }

    #[test]
    fn test_duplicate_value_id_first_wins() {
        let set = ValueSet::base("s", "S")
            .with_value(number("a", 1.0))
            .with_value(number("a", 2.0));
        match set.members() {
            ValueSetMembers::Base(values) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].number(), Ok(1.0));
            }
            ValueSetMembers::Compound(_) => panic!("expected base set"),
        }
    }

    #[test]
    fn test_deserialize_rebinds_values() {
        let json = serde_json::json!({
            "id": "martial",
            "label": "Martial Weapons",
            "label_singular": "Martial Weapon",
            "members": {"base": [
                {"id": "longsword", "value_set_id": "simple", "payload": {"number": 8.0}},
                {"id": "longsword", "value_set_id": "martial", "payload": {"number": 10.0}}
            ]}
        });
        let set: ValueSet = serde_json::from_value(json).unwrap();
        assert_eq!(
            set,
            ValueSet::base("martial", "Martial Weapons")
                .with_singular("Martial Weapon")
                .with_value(number("longsword", 8.0))
        );

        let json = serde_json::json!({
            "id": "weapons",
            "label": "Weapons",
            "label_singular": "Weapon",
            "members": {"compound": ["martial", "simple", "martial"]}
        });
        let set: ValueSet = serde_json::from_value(json).unwrap();
        assert_eq!(
            set.members(),
            &ValueSetMembers::Compound(vec![ValueSetId::new("martial"), ValueSetId::new("simple")])
        );
    }

    #[test]
    fn test_missing_value() {
        let registry = registry();
        let err = registry
            .lookup(&ValueReference::new("simple", "longsword"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownValue { .. }));

        let err = registry
            .lookup(&ValueReference::new("exotic", "whip"))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownValueSet(ValueSetId::new("exotic")));
    }

    #[test]
    fn test_self_including_compound_is_cyclic() {
        let mut registry = ValueSetRegistry::new();
        registry.insert(ValueSet::compound("loop", "Loop").with_member("loop"));
        assert_eq!(
            registry.resolve_set(&ValueSetId::new("loop")).unwrap_err(),
            EngineError::CyclicValueSet(ValueSetId::new("loop"))
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut registry = registry();
        registry.insert(
            ValueSet::compound("all", "All")
                .with_member("weapons")
                .with_member("simple"),
        );
        let values = registry.resolve_set(&ValueSetId::new("all")).unwrap();
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_depth_limit() {
        let mut registry = ValueSetRegistry::new();
        registry.insert(ValueSet::base("leaf", "Leaf").with_value(number("x", 1.0)));
        registry.insert(ValueSet::compound("c1", "C1").with_member("leaf"));
        registry.insert(ValueSet::compound("c2", "C2").with_member("c1"));
        assert!(registry.resolve_set_limited(&ValueSetId::new("c2"), 2).is_ok());
        assert!(matches!(
            registry.resolve_set_limited(&ValueSetId::new("c2"), 1),
            Err(EngineError::DepthExceeded { .. })
        ));
    }
}
