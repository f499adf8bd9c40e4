//! Testing utilities for rules content and sheets.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedDice` for dice that land on chosen faces
//! - `RulebookBuilder` and `StoreBuilder` for assembling fixtures
//! - Assertion helpers for checking evaluated variables

use crate::dice::DiceSource;
use crate::error::EngineResult;
use crate::function::{Function, Tuple, TypeSignature};
use crate::mechanic::Mechanic;
use crate::program::Program;
use crate::rulebook::Rulebook;
use crate::sheet::Sheet;
use crate::store::VariableStore;
use crate::summation::Summation;
use crate::value::{EngineValue, EngineValueType};
use crate::value_set::{Value, ValuePayload, ValueSet};
use crate::variable::{
    BooleanVariableValue, NumberVariableValue, TextVariableValue, Variable, VariableId,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// A dice source that returns scripted faces in order.
///
/// Every request is recorded so tests can check how many dice were drawn
/// and of which size.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    requests: Vec<u32>,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    /// Sides of every die requested so far, in order.
    pub fn requests(&self) -> &[u32] {
        &self.requests
    }

    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    /// # Panics
    ///
    /// Panics when the script is exhausted or a scripted face does not fit
    /// on the requested die.
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.requests.push(sides);
        let face = match self.faces.pop_front() {
            Some(face) => face,
            None => panic!("ScriptedDice ran out of faces (request for d{sides})"),
        };
        assert!(
            (1..=sides).contains(&face),
            "scripted face {face} does not fit on a d{sides}"
        );
        face
    }
}

/// Fluent builder for rulebook fixtures.
#[derive(Debug, Default)]
pub struct RulebookBuilder {
    rulebook: Rulebook,
}

impl RulebookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A number-only function tabulated by `rows` of `(arguments, result)`.
    pub fn number_function(mut self, id: &str, arity: usize, rows: &[(&[f64], f64)]) -> Self {
        let signature = TypeSignature::new(vec![EngineValueType::Number; arity], EngineValueType::Number);
        let function = rows.iter().fold(Function::new(id, signature), |f, (args, result)| {
            let args: Vec<EngineValue> = args.iter().map(|&n| EngineValue::Number(n)).collect();
            f.with_tuple(Tuple::new(args, *result))
        });
        self.rulebook.add_function(function);
        self
    }

    pub fn function(mut self, function: Function) -> Self {
        self.rulebook.add_function(function);
        self
    }

    pub fn program(mut self, program: Program) -> Self {
        self.rulebook.add_program(program);
        self
    }

    pub fn summation(mut self, summation: Summation) -> Self {
        self.rulebook.add_summation(summation);
        self
    }

    pub fn mechanic(mut self, mechanic: Mechanic) -> Self {
        self.rulebook.add_mechanic(mechanic);
        self
    }

    pub fn value_set(mut self, set: ValueSet) -> Self {
        self.rulebook.add_value_set(set);
        self
    }

    /// A base set of number values.
    pub fn number_set(self, id: &str, values: &[(&str, f64)]) -> Self {
        let set = values.iter().fold(ValueSet::base(id, id), |set, (value_id, n)| {
            set.with_value(Value::new(id, *value_id, ValuePayload::Number(*n)))
        });
        self.value_set(set.with_value_type(EngineValueType::Number))
    }

    pub fn build(self) -> Rulebook {
        self.rulebook
    }

    pub fn shared(self) -> Arc<Rulebook> {
        Arc::new(self.rulebook)
    }
}

/// Fluent builder for variable store fixtures.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    variables: Vec<Variable>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn number(self, id: &str, n: f64) -> Self {
        self.variable(Variable::number(id, id, NumberVariableValue::Literal(n)))
    }

    pub fn boolean(self, id: &str, b: bool) -> Self {
        self.variable(Variable::boolean(id, id, BooleanVariableValue::Literal(b)))
    }

    pub fn text(self, id: &str, s: &str) -> Self {
        self.variable(Variable::text(id, id, TextVariableValue::Literal(s.to_string())))
    }

    pub fn build(self) -> EngineResult<VariableStore> {
        VariableStore::from_variables(self.variables)
    }
}

/// Assert that a sheet variable evaluates to `expected`.
pub fn assert_value(sheet: &Sheet, id: &str, dice: &mut dyn DiceSource, expected: EngineValue) {
    let id = VariableId::new(id);
    match sheet.value(&id, dice) {
        Ok(actual) => assert_eq!(actual, expected, "Variable {id} evaluated to {actual}"),
        Err(e) => panic!("Variable {id} failed to evaluate: {e}"),
    }
}

/// Assert that a sheet variable evaluates to the number `expected`.
pub fn assert_number(sheet: &Sheet, id: &str, dice: &mut dyn DiceSource, expected: f64) {
    assert_value(sheet, id, dice, EngineValue::Number(expected));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_scripted_dice_records_requests() {
        let mut dice = ScriptedDice::new([3, 20]);
        assert_eq!(dice.roll_die(6), 3);
        assert_eq!(dice.roll_die(20), 20);
        assert_eq!(dice.requests(), &[6, 20]);
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "ran out of faces")]
    fn test_scripted_dice_exhausted() {
        let mut dice = ScriptedDice::new([]);
        dice.roll_die(6);
    }

    #[test]
    fn test_builders() {
        let rulebook = RulebookBuilder::new()
            .number_function("add2", 2, &[(&[1.0, 1.0], 2.0)])
            .number_set("sizes", &[("small", 1.0), ("large", 2.0)])
            .shared();
        let store = StoreBuilder::new().number("str", 10.0).boolean("prof", true).build().unwrap();
        let sheet = Sheet::with_store(rulebook, store);
        let mut dice = ScriptedDice::new([]);
        assert_number(&sheet, "str", &mut dice, 10.0);
        assert_value(&sheet, "prof", &mut dice, EngineValue::Boolean(true));

        let dup = StoreBuilder::new().number("x", 1.0).number("x", 2.0).build();
        assert_eq!(dup.unwrap_err(), EngineError::DuplicateVariable(VariableId::new("x")));
    }
}
