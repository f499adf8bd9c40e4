//! The evaluator: resolves sheet variables against a rulebook.
//!
//! An [`Evaluator`] borrows one rulebook, one variable store and one dice
//! source for the length of an evaluation. It tracks the programs and
//! variables currently being evaluated so that cycles and runaway nesting
//! come back as errors instead of overflowing the stack.

use crate::dice::{DiceRoll, DiceSource, DEFAULT_MAX_DICE};
use crate::environment::Environment;
use crate::error::{EngineError, EngineResult};
use crate::id::{FunctionId, ProgramId, SummationId};
use crate::program::Invocation;
use crate::rulebook::Rulebook;
use crate::store::VariableStore;
use crate::value::{EngineValue, EngineValueType};
use crate::value_set::{Value, ValueReference, DEFAULT_MAX_VALUE_SET_DEPTH};
use crate::variable::{
    BooleanVariableValue, DiceRollVariableValue, NumberVariableValue, TextVariableValue, Variable, VariableId,
    VariableReference, VariableValue,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_MAX_INVOCATION_DEPTH: usize = 64;
pub const DEFAULT_MAX_VARIABLE_DEPTH: usize = 128;

/// Limits applied during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest chain of nested program invocations.
    pub max_invocation_depth: usize,
    /// Deepest chain of variables evaluated through one another.
    pub max_variable_depth: usize,
    /// Deepest nesting of compound value sets.
    pub max_value_set_depth: usize,
    /// Most dice one roll may draw.
    pub max_dice_per_roll: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_invocation_depth: DEFAULT_MAX_INVOCATION_DEPTH,
            max_variable_depth: DEFAULT_MAX_VARIABLE_DEPTH,
            max_value_set_depth: DEFAULT_MAX_VALUE_SET_DEPTH,
            max_dice_per_roll: DEFAULT_MAX_DICE,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `CHARSHEET_MAX_INVOCATION_DEPTH`,
    /// `CHARSHEET_MAX_VARIABLE_DEPTH`, `CHARSHEET_MAX_VALUE_SET_DEPTH` and
    /// `CHARSHEET_MAX_DICE_PER_ROLL`.
    /// Values that do not parse are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(depth) = env_usize("CHARSHEET_MAX_INVOCATION_DEPTH") {
            config.max_invocation_depth = depth;
        }
        if let Some(depth) = env_usize("CHARSHEET_MAX_VARIABLE_DEPTH") {
            config.max_variable_depth = depth;
        }
        if let Some(depth) = env_usize("CHARSHEET_MAX_VALUE_SET_DEPTH") {
            config.max_value_set_depth = depth;
        }
        if let Some(dice) = env_usize("CHARSHEET_MAX_DICE_PER_ROLL") {
            config.max_dice_per_roll = dice;
        }
        config
    }

    pub fn with_max_invocation_depth(mut self, depth: usize) -> Self {
        self.max_invocation_depth = depth;
        self
    }

    pub fn with_max_variable_depth(mut self, depth: usize) -> Self {
        self.max_variable_depth = depth;
        self
    }

    pub fn with_max_value_set_depth(mut self, depth: usize) -> Self {
        self.max_value_set_depth = depth;
        self
    }

    pub fn with_max_dice_per_roll(mut self, dice: usize) -> Self {
        self.max_dice_per_roll = dice;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}

// ============================================================================
// Evaluator
// ============================================================================

pub struct Evaluator<'a> {
    rulebook: &'a Rulebook,
    store: &'a VariableStore,
    dice: &'a mut dyn DiceSource,
    config: EngineConfig,
    /// Programs currently running, outermost first.
    invocations: Vec<ProgramId>,
    /// Variables currently being evaluated, outermost first.
    evaluating: Vec<VariableId>,
}

impl<'a> Evaluator<'a> {
    pub fn new(rulebook: &'a Rulebook, store: &'a VariableStore, dice: &'a mut dyn DiceSource) -> Self {
        Self {
            rulebook,
            store,
            dice,
            config: EngineConfig::default(),
            invocations: Vec::new(),
            evaluating: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a variable's current value.
    pub fn evaluate_variable(&mut self, id: &VariableId) -> EngineResult<EngineValue> {
        if self.evaluating.contains(id) {
            return Err(EngineError::CyclicVariable(id.clone()));
        }
        if self.evaluating.len() >= self.config.max_variable_depth {
            return Err(EngineError::DepthExceeded {
                what: "variable",
                limit: self.config.max_variable_depth,
            });
        }
        let store = self.store;
        let variable = store.get(id)?;

        self.evaluating.push(id.clone());
        let result = self.evaluate_value(variable);
        self.evaluating.pop();
        result
    }

    fn evaluate_value(&mut self, variable: &Variable) -> EngineResult<EngineValue> {
        let not_set = || EngineError::ValueNotSet(variable.id.clone());
        match variable.value() {
            VariableValue::Boolean(value) => match value {
                BooleanVariableValue::Literal(b) => Ok(EngineValue::Boolean(*b)),
                BooleanVariableValue::Program(invocation) => self
                    .invoke(invocation)?
                    .expect_type(EngineValueType::Boolean),
            },
            VariableValue::Number(value) => match value {
                NumberVariableValue::Literal(n) => Ok(EngineValue::Number(*n)),
                NumberVariableValue::Unknown => Err(not_set()),
                NumberVariableValue::Variable(id) => self
                    .evaluate_variable(id)?
                    .expect_type(EngineValueType::Number),
                NumberVariableValue::Program(invocation) => self
                    .invoke(invocation)?
                    .expect_type(EngineValueType::Number),
                NumberVariableValue::Value(reference) => Ok(EngineValue::Number(self.value(reference)?.number()?)),
                NumberVariableValue::Summation(id) => Ok(EngineValue::Number(self.evaluate_summation(id)?)),
            },
            VariableValue::Text(value) => match value {
                TextVariableValue::Literal(s) => Ok(EngineValue::Text(s.clone())),
                TextVariableValue::Unknown | TextVariableValue::ValueSetChoice(_) => Err(not_set()),
                TextVariableValue::Value(reference) => Ok(EngineValue::Text(self.value(reference)?.text()?.to_string())),
                TextVariableValue::Program(invocation) => self
                    .invoke(invocation)?
                    .expect_type(EngineValueType::Text),
            },
            VariableValue::DiceRoll(DiceRollVariableValue::Literal(roll)) => Ok(EngineValue::DiceRoll(roll.clone())),
        }
    }

    /// Run a program on already-resolved arguments.
    pub fn run_program(&mut self, id: &ProgramId, args: Vec<EngineValue>) -> EngineResult<EngineValue> {
        let rulebook = self.rulebook;
        let program = rulebook.program(id)?;
        if self.invocations.contains(id) {
            return Err(EngineError::CyclicInvocation(id.clone()));
        }
        if self.invocations.len() >= self.config.max_invocation_depth {
            return Err(EngineError::DepthExceeded {
                what: "invocation",
                limit: self.config.max_invocation_depth,
            });
        }

        debug!(program = %id, depth = self.invocations.len(), "Invoking program");
        self.invocations.push(id.clone());
        let result = program.execute(&args, self);
        self.invocations.pop();
        if let Ok(value) = &result {
            debug!(program = %id, result = %value, "Program finished");
        }
        result
    }

    pub fn evaluate_summation(&mut self, id: &SummationId) -> EngineResult<f64> {
        let rulebook = self.rulebook;
        rulebook.summation(id)?.evaluate(self)
    }

    /// Run `program_id` on every tuple of `function_id` and compare results.
    pub fn check_conformance(&mut self, program_id: &ProgramId, function_id: &FunctionId) -> EngineResult<ConformanceReport> {
        let rulebook = self.rulebook;
        rulebook.program(program_id)?;
        let function = rulebook.function(function_id)?;

        let mut report = ConformanceReport {
            program_id: program_id.clone(),
            function_id: function_id.clone(),
            passed: 0,
            failures: Vec::new(),
        };
        for (row, tuple) in function.tuples().iter().enumerate() {
            let actual = self.run_program(program_id, tuple.parameters.clone());
            if actual.as_ref() == Ok(&tuple.result) {
                report.passed += 1;
            } else {
                report.failures.push(ConformanceFailure {
                    row,
                    arguments: tuple.parameters.clone(),
                    expected: tuple.result.clone(),
                    actual,
                });
            }
        }
        Ok(report)
    }
}

impl Environment for Evaluator<'_> {
    fn variable(&mut self, reference: &VariableReference) -> EngineResult<EngineValue> {
        let id = self.store.resolve_single(reference)?.id.clone();
        self.evaluate_variable(&id)
    }

    fn variables(&mut self, reference: &VariableReference) -> EngineResult<Vec<EngineValue>> {
        let ids: Vec<VariableId> = self
            .store
            .resolve(reference)?
            .into_iter()
            .map(|v| v.id.clone())
            .collect();
        ids.iter().map(|id| self.evaluate_variable(id)).collect()
    }

    fn value(&self, reference: &ValueReference) -> EngineResult<&Value> {
        self.rulebook
            .value_sets
            .lookup_limited(reference, self.config.max_value_set_depth)
    }

    fn invoke(&mut self, invocation: &Invocation) -> EngineResult<EngineValue> {
        let args = invocation.resolve_arguments(self)?;
        self.run_program(&invocation.program_id, args)
    }

    fn apply(&mut self, function_id: &FunctionId, args: Vec<EngineValue>) -> EngineResult<EngineValue> {
        let rulebook = self.rulebook;
        if let Ok(function) = rulebook.function(function_id) {
            return function.apply(&args);
        }
        let program_id = ProgramId::new(function_id.as_str());
        match rulebook.program(&program_id) {
            Ok(_) => self.run_program(&program_id, args),
            Err(_) => Err(EngineError::UnknownFunction(function_id.clone())),
        }
    }

    fn summation(&mut self, id: &SummationId) -> EngineResult<f64> {
        self.evaluate_summation(id)
    }

    fn roll(&mut self, roll: &DiceRoll) -> EngineResult<f64> {
        let outcome = roll.roll_detailed_limited(&mut *self.dice, self.config.max_dice_per_roll)?;
        debug!(roll = %roll, outcome = %outcome, "Rolled dice");
        Ok(outcome.total)
    }
}

// ============================================================================
// Conformance
// ============================================================================

/// A tuple whose expected result the program did not reproduce.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceFailure {
    /// Index of the tuple in the function's table.
    pub row: usize,
    pub arguments: Vec<EngineValue>,
    pub expected: EngineValue,
    pub actual: EngineResult<EngineValue>,
}

/// Outcome of running a program against a function's tuple table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceReport {
    pub program_id: ProgramId,
    pub function_id: FunctionId,
    pub passed: usize,
    pub failures: Vec<ConformanceFailure>,
}

impl ConformanceReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.passed + self.failures.len()
    }
}
