//! Sheet variables.
//!
//! A variable is a named, typed, mutable slot in a character sheet. Its
//! current value is itself a small union: a literal, or an indirection
//! through another variable, a value set entry, a summation or a program
//! invocation. Number variables also keep an append-only history of
//! assignments.

use crate::dice::DiceRoll;
use crate::error::{EngineError, EngineResult};
use crate::id::{SummationId, ValueSetId};
use crate::program::Invocation;
use crate::value::EngineValueType;
use crate::value_set::ValueReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Addressing
// ============================================================================

/// Identifier of a variable.
///
/// Equality is on the `(namespace, name)` pair: an unqualified id is distinct
/// from every qualified id with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl VariableId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}::{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for VariableId {
    fn from(name: &str) -> Self {
        VariableId::new(name)
    }
}

/// A tag shared by a group of variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableTag(pub String);

impl VariableTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for VariableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to one variable by id, or to every variable carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableReference {
    Id(VariableId),
    Tag(VariableTag),
}

impl VariableReference {
    pub fn id(name: impl Into<String>) -> Self {
        VariableReference::Id(VariableId::new(name))
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        VariableReference::Tag(VariableTag::new(tag))
    }
}

impl From<VariableId> for VariableReference {
    fn from(id: VariableId) -> Self {
        VariableReference::Id(id)
    }
}

impl fmt::Display for VariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableReference::Id(id) => write!(f, "{id}"),
            VariableReference::Tag(tag) => write!(f, "#{tag}"),
        }
    }
}

// ============================================================================
// Current values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BooleanVariableValue {
    Literal(bool),
    Program(Invocation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NumberVariableValue {
    Literal(f64),
    /// The value is not known yet (e.g. the player still has to roll it).
    Unknown,
    Variable(VariableId),
    Program(Invocation),
    Value(ValueReference),
    Summation(SummationId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TextVariableValue {
    Literal(String),
    Unknown,
    Value(ValueReference),
    Program(Invocation),
    /// A value the player still has to pick from the given set.
    ValueSetChoice(ValueSetId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiceRollVariableValue {
    Literal(DiceRoll),
}

/// The current value of a variable, tagged by the variable's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableValue {
    Boolean(BooleanVariableValue),
    Number(NumberVariableValue),
    Text(TextVariableValue),
    DiceRoll(DiceRollVariableValue),
}

impl VariableValue {
    pub fn value_type(&self) -> EngineValueType {
        match self {
            VariableValue::Boolean(_) => EngineValueType::Boolean,
            VariableValue::Number(_) => EngineValueType::Number,
            VariableValue::Text(_) => EngineValueType::Text,
            VariableValue::DiceRoll(_) => EngineValueType::DiceRoll,
        }
    }

    /// Variables this value reads directly.
    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            VariableValue::Boolean(BooleanVariableValue::Program(invocation))
            | VariableValue::Number(NumberVariableValue::Program(invocation))
            | VariableValue::Text(TextVariableValue::Program(invocation)) => {
                invocation.dependencies()
            }
            VariableValue::Number(NumberVariableValue::Variable(id)) => {
                BTreeSet::from([VariableReference::Id(id.clone())])
            }
            _ => BTreeSet::new(),
        }
    }
}

// ============================================================================
// History
// ============================================================================

/// One recorded assignment of a number variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: NumberVariableValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HistoryEntry {
    pub fn new(value: NumberVariableValue) -> Self {
        Self {
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Append-only log of a number variable's assignments.
///
/// Entries are never edited, reordered or removed once appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberVariableHistory {
    entries: Vec<HistoryEntry>,
}

impl NumberVariableHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Variable
// ============================================================================

/// A typed variable on a character sheet.
///
/// Deserializing goes through [`Variable::with_history`], so a stored
/// history on a non-number variable is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariableFields")]
pub struct Variable {
    pub id: VariableId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<VariableTag>,
    value: VariableValue,
    /// Only number variables ever record history.
    #[serde(default, skip_serializing_if = "NumberVariableHistory::is_empty")]
    history: NumberVariableHistory,
}

#[derive(Deserialize)]
struct VariableFields {
    id: VariableId,
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: BTreeSet<VariableTag>,
    value: VariableValue,
    #[serde(default)]
    history: NumberVariableHistory,
}

impl TryFrom<VariableFields> for Variable {
    type Error = EngineError;

    fn try_from(fields: VariableFields) -> EngineResult<Self> {
        let mut variable = Variable::new(fields.id, fields.label, fields.value).with_description(fields.description);
        variable.tags = fields.tags;
        variable.with_history(fields.history)
    }
}

impl Variable {
    pub fn new(id: impl Into<VariableId>, label: impl Into<String>, value: VariableValue) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            value,
            history: NumberVariableHistory::new(),
        }
    }

    pub fn number(id: impl Into<VariableId>, label: impl Into<String>, value: NumberVariableValue) -> Self {
        Self::new(id, label, VariableValue::Number(value))
    }

    pub fn boolean(id: impl Into<VariableId>, label: impl Into<String>, value: BooleanVariableValue) -> Self {
        Self::new(id, label, VariableValue::Boolean(value))
    }

    pub fn text(id: impl Into<VariableId>, label: impl Into<String>, value: TextVariableValue) -> Self {
        Self::new(id, label, VariableValue::Text(value))
    }

    pub fn dice_roll(id: impl Into<VariableId>, label: impl Into<String>, roll: DiceRoll) -> Self {
        Self::new(
            id,
            label,
            VariableValue::DiceRoll(DiceRollVariableValue::Literal(roll)),
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(VariableTag::new(tag));
        self
    }

    /// Attach a previously recorded history (number variables only).
    pub fn with_history(mut self, history: NumberVariableHistory) -> EngineResult<Self> {
        if self.value_type() != EngineValueType::Number && !history.is_empty() {
            return Err(EngineError::HistoryUnsupported(self.id));
        }
        self.history = history;
        Ok(self)
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn value_type(&self) -> EngineValueType {
        self.value.value_type()
    }

    pub fn has_tag(&self, tag: &VariableTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn history(&self) -> &NumberVariableHistory {
        &self.history
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        self.value.dependencies()
    }

    /// Replace the current value. The new value must have the variable's type.
    pub(crate) fn assign(&mut self, value: VariableValue) -> EngineResult<()> {
        let expected = self.value_type();
        let found = value.value_type();
        if expected != found {
            return Err(EngineError::TypeMismatch { expected, found });
        }
        self.value = value;
        Ok(())
    }

    pub(crate) fn append_history(&mut self, entry: HistoryEntry) -> EngineResult<()> {
        if self.value_type() != EngineValueType::Number {
            return Err(EngineError::HistoryUnsupported(self.id.clone()));
        }
        self.history.append(entry);
        Ok(())
    }
}
