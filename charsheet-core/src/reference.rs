//! Typed data references.
//!
//! A reference is a lazy, typed pointer to a literal, a variable or a value
//! set entry. Resolving it goes through the [`Environment`] and yields a
//! value of the reference's type or fails with a type mismatch.

use crate::dice::DiceRoll;
use crate::environment::Environment;
use crate::error::EngineResult;
use crate::value::{EngineValue, EngineValueType};
use crate::value_set::ValueReference;
use crate::variable::VariableReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanReference {
    Literal(bool),
    Variable(VariableReference),
}

impl BooleanReference {
    pub fn resolve(&self, env: &mut dyn Environment) -> EngineResult<bool> {
        match self {
            BooleanReference::Literal(b) => Ok(*b),
            BooleanReference::Variable(reference) => env.variable(reference)?.into_boolean(),
        }
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            BooleanReference::Literal(_) => BTreeSet::new(),
            BooleanReference::Variable(reference) => BTreeSet::from([reference.clone()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberReference {
    Literal(f64),
    Variable(VariableReference),
    Value(ValueReference),
}

impl NumberReference {
    pub fn resolve(&self, env: &mut dyn Environment) -> EngineResult<f64> {
        match self {
            NumberReference::Literal(n) => Ok(*n),
            NumberReference::Variable(reference) => env.variable(reference)?.into_number(),
            NumberReference::Value(reference) => env.value(reference)?.number(),
        }
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            NumberReference::Variable(reference) => BTreeSet::from([reference.clone()]),
            _ => BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceRollReference {
    Literal(DiceRoll),
    Variable(VariableReference),
}

impl DiceRollReference {
    pub fn resolve(&self, env: &mut dyn Environment) -> EngineResult<DiceRoll> {
        match self {
            DiceRollReference::Literal(roll) => Ok(roll.clone()),
            DiceRollReference::Variable(reference) => env.variable(reference)?.into_dice_roll(),
        }
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            DiceRollReference::Literal(_) => BTreeSet::new(),
            DiceRollReference::Variable(reference) => BTreeSet::from([reference.clone()]),
        }
    }
}

/// A reference of any of the three referenceable types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataReference {
    Boolean(BooleanReference),
    Number(NumberReference),
    DiceRoll(DiceRollReference),
}

impl DataReference {
    pub fn value_type(&self) -> EngineValueType {
        match self {
            DataReference::Boolean(_) => EngineValueType::Boolean,
            DataReference::Number(_) => EngineValueType::Number,
            DataReference::DiceRoll(_) => EngineValueType::DiceRoll,
        }
    }

    pub fn resolve(&self, env: &mut dyn Environment) -> EngineResult<EngineValue> {
        Ok(match self {
            DataReference::Boolean(r) => EngineValue::Boolean(r.resolve(env)?),
            DataReference::Number(r) => EngineValue::Number(r.resolve(env)?),
            DataReference::DiceRoll(r) => EngineValue::DiceRoll(r.resolve(env)?),
        })
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            DataReference::Boolean(r) => r.dependencies(),
            DataReference::Number(r) => r.dependencies(),
            DataReference::DiceRoll(r) => r.dependencies(),
        }
    }
}

impl From<f64> for DataReference {
    fn from(n: f64) -> Self {
        DataReference::Number(NumberReference::Literal(n))
    }
}

impl From<bool> for DataReference {
    fn from(b: bool) -> Self {
        DataReference::Boolean(BooleanReference::Literal(b))
    }
}

impl From<DiceRoll> for DataReference {
    fn from(roll: DiceRoll) -> Self {
        DataReference::DiceRoll(DiceRollReference::Literal(roll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Evaluator;
    use crate::error::EngineError;
    use crate::rulebook::Rulebook;
    use crate::store::VariableStore;
    use crate::testing::ScriptedDice;
    use crate::variable::{BooleanVariableValue, NumberVariableValue, Variable};

    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store
            .insert(Variable::number("str", "Strength", NumberVariableValue::Literal(16.0)).with_tag("ability"))
            .unwrap();
        store
            .insert(Variable::number("dex", "Dexterity", NumberVariableValue::Literal(12.0)).with_tag("ability"))
            .unwrap();
        store
            .insert(Variable::boolean("proficient", "Proficient", BooleanVariableValue::Literal(true)))
            .unwrap();
        store
    }

    #[test]
    fn test_literals_resolve_to_themselves() {
        let rulebook = Rulebook::new();
        let store = VariableStore::new();
        let mut dice = ScriptedDice::new([]);
        let mut env = Evaluator::new(&rulebook, &store, &mut dice);

        assert_eq!(DataReference::from(4.0).resolve(&mut env), Ok(EngineValue::Number(4.0)));
        assert_eq!(DataReference::from(false).resolve(&mut env), Ok(EngineValue::Boolean(false)));
        let roll = DiceRoll::new().with_dice(1, 20);
        assert_eq!(
            DataReference::from(roll.clone()).resolve(&mut env),
            Ok(EngineValue::DiceRoll(roll))
        );
    }

    #[test]
    fn test_variable_reference_is_type_checked() {
        let rulebook = Rulebook::new();
        let store = store();
        let mut dice = ScriptedDice::new([]);
        let mut env = Evaluator::new(&rulebook, &store, &mut dice);

        let number = NumberReference::Variable(VariableReference::id("str"));
        assert_eq!(number.resolve(&mut env), Ok(16.0));

        let wrong = NumberReference::Variable(VariableReference::id("proficient"));
        assert_eq!(
            wrong.resolve(&mut env),
            Err(EngineError::TypeMismatch {
                expected: EngineValueType::Number,
                found: EngineValueType::Boolean,
            })
        );
    }

    #[test]
    fn test_tag_reference_must_be_unique() {
        let rulebook = Rulebook::new();
        let store = store();
        let mut dice = ScriptedDice::new([]);
        let mut env = Evaluator::new(&rulebook, &store, &mut dice);

        let reference = NumberReference::Variable(VariableReference::tag("ability"));
        assert!(matches!(
            reference.resolve(&mut env),
            Err(EngineError::AmbiguousReference { matches: 2, .. })
        ));
    }

    #[test]
    fn test_dependencies() {
        let literal = DataReference::from(1.0);
        assert!(literal.dependencies().is_empty());

        let reference = DataReference::Boolean(BooleanReference::Variable(VariableReference::id("proficient")));
        assert_eq!(
            reference.dependencies(),
            BTreeSet::from([VariableReference::id("proficient")])
        );
        assert_eq!(reference.value_type(), EngineValueType::Boolean);
    }
}
