//! Engine values: the typed results every rules computation produces.
//!
//! Type checks in the engine are exact tag comparisons. Numbers are never
//! read as text and booleans are never read as numbers.

use crate::dice::DiceRoll;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Type tag of an [`EngineValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineValueType {
    Number,
    Text,
    Boolean,
    DiceRoll,
    ListText,
}

impl EngineValueType {
    /// Name used for this type in rulebook documents.
    pub fn name(&self) -> &'static str {
        match self {
            EngineValueType::Number => "number",
            EngineValueType::Text => "text",
            EngineValueType::Boolean => "boolean",
            EngineValueType::DiceRoll => "dice_roll",
            EngineValueType::ListText => "list_text",
        }
    }

    pub fn all() -> [EngineValueType; 5] {
        [
            EngineValueType::Number,
            EngineValueType::Text,
            EngineValueType::Boolean,
            EngineValueType::DiceRoll,
            EngineValueType::ListText,
        ]
    }
}

impl fmt::Display for EngineValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineValueType::Number => "Number",
            EngineValueType::Text => "Text",
            EngineValueType::Boolean => "Boolean",
            EngineValueType::DiceRoll => "Dice Roll",
            EngineValueType::ListText => "List Text",
        };
        f.write_str(label)
    }
}

/// Error returned when a type name is not one of the engine's types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown engine value type: {0}")]
pub struct ParseValueTypeError(pub String);

impl FromStr for EngineValueType {
    type Err = ParseValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineValueType::all()
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ParseValueTypeError(s.to_string()))
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EngineValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    DiceRoll(DiceRoll),
    ListText(Vec<String>),
}

impl EngineValue {
    pub fn value_type(&self) -> EngineValueType {
        match self {
            EngineValue::Number(_) => EngineValueType::Number,
            EngineValue::Text(_) => EngineValueType::Text,
            EngineValue::Boolean(_) => EngineValueType::Boolean,
            EngineValue::DiceRoll(_) => EngineValueType::DiceRoll,
            EngineValue::ListText(_) => EngineValueType::ListText,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EngineValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EngineValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EngineValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_dice_roll(&self) -> Option<&DiceRoll> {
        match self {
            EngineValue::DiceRoll(roll) => Some(roll),
            _ => None,
        }
    }

    /// Return the value unchanged if its tag is `expected`.
    pub fn expect_type(self, expected: EngineValueType) -> EngineResult<Self> {
        let found = self.value_type();
        if found == expected {
            Ok(self)
        } else {
            Err(EngineError::TypeMismatch { expected, found })
        }
    }

    pub fn into_number(self) -> EngineResult<f64> {
        match self {
            EngineValue::Number(n) => Ok(n),
            other => Err(mismatch(EngineValueType::Number, &other)),
        }
    }

    pub fn into_text(self) -> EngineResult<String> {
        match self {
            EngineValue::Text(s) => Ok(s),
            other => Err(mismatch(EngineValueType::Text, &other)),
        }
    }

    pub fn into_boolean(self) -> EngineResult<bool> {
        match self {
            EngineValue::Boolean(b) => Ok(b),
            other => Err(mismatch(EngineValueType::Boolean, &other)),
        }
    }

    pub fn into_dice_roll(self) -> EngineResult<DiceRoll> {
        match self {
            EngineValue::DiceRoll(roll) => Ok(roll),
            other => Err(mismatch(EngineValueType::DiceRoll, &other)),
        }
    }
}

fn mismatch(expected: EngineValueType, found: &EngineValue) -> EngineError {
    EngineError::TypeMismatch {
        expected,
        found: found.value_type(),
    }
}

/// Format a number the way a sheet shows it: whole numbers without a
/// fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for EngineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineValue::Number(n) => f.write_str(&format_number(*n)),
            EngineValue::Text(s) => f.write_str(s),
            EngineValue::Boolean(b) => write!(f, "{b}"),
            EngineValue::DiceRoll(roll) => write!(f, "{roll}"),
            EngineValue::ListText(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<f64> for EngineValue {
    fn from(n: f64) -> Self {
        EngineValue::Number(n)
    }
}

impl From<bool> for EngineValue {
    fn from(b: bool) -> Self {
        EngineValue::Boolean(b)
    }
}

impl From<String> for EngineValue {
    fn from(s: String) -> Self {
        EngineValue::Text(s)
    }
}

impl From<&str> for EngineValue {
    fn from(s: &str) -> Self {
        EngineValue::Text(s.to_string())
    }
}

impl From<DiceRoll> for EngineValue {
    fn from(roll: DiceRoll) -> Self {
        EngineValue::DiceRoll(roll)
    }
}
