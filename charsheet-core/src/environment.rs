//! The evaluation environment seen by references, summations and programs.
//!
//! Rule objects never reach into the sheet or the rulebook themselves. They
//! ask an [`Environment`] for whatever they need, which keeps the rule model
//! independent of where variables live and how dice are rolled. The
//! [`Evaluator`](crate::engine::Evaluator) is the production implementation.

use crate::dice::DiceRoll;
use crate::error::EngineResult;
use crate::id::{FunctionId, SummationId};
use crate::program::Invocation;
use crate::value::EngineValue;
use crate::value_set::{Value, ValueReference};
use crate::variable::VariableReference;

pub trait Environment {
    /// Evaluate the single variable `reference` names.
    ///
    /// A tag reference must match exactly one variable.
    fn variable(&mut self, reference: &VariableReference) -> EngineResult<EngineValue>;

    /// Evaluate every variable `reference` names, ordered by variable id.
    fn variables(&mut self, reference: &VariableReference) -> EngineResult<Vec<EngineValue>>;

    fn value(&self, reference: &ValueReference) -> EngineResult<&Value>;

    /// Resolve the invocation's arguments and run its program.
    fn invoke(&mut self, invocation: &Invocation) -> EngineResult<EngineValue>;

    /// Apply a function, or a program registered under the same id.
    fn apply(&mut self, function_id: &FunctionId, args: Vec<EngineValue>) -> EngineResult<EngineValue>;

    fn summation(&mut self, id: &SummationId) -> EngineResult<f64>;

    fn roll(&mut self, roll: &DiceRoll) -> EngineResult<f64>;
}
