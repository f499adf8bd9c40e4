//! Error types for rules evaluation.
//!
//! Every failure is a recoverable value. Evaluation stops at the first error
//! it meets (in evaluation order) and hands it back to the caller, which is
//! free to carry on with unrelated computations on the same sheet.

use crate::id::{BindingName, FunctionId, ProgramId, SummationId, ValueId, ValueSetId};
use crate::value::EngineValueType;
use crate::variable::{VariableId, VariableTag};
use thiserror::Error;

/// Error type for reference resolution and evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: EngineValueType,
        found: EngineValueType,
    },

    #[error("Type signature mismatch in {target}: {reason}")]
    TypeSignatureMismatch { target: String, reason: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(VariableId),

    #[error("Tag '{tag}' matches {matches} variables where exactly one is required")]
    AmbiguousReference { tag: VariableTag, matches: usize },

    #[error("Unknown value '{value_id}' in value set '{value_set_id}'")]
    UnknownValue {
        value_set_id: ValueSetId,
        value_id: ValueId,
    },

    #[error("Unknown value set: {0}")]
    UnknownValueSet(ValueSetId),

    #[error("Value set '{0}' includes itself")]
    CyclicValueSet(ValueSetId),

    #[error("No tuple of function '{0}' matches the arguments")]
    NoMatchingTuple(FunctionId),

    #[error("Unknown function: {0}")]
    UnknownFunction(FunctionId),

    #[error("Unknown program: {0}")]
    UnknownProgram(ProgramId),

    #[error("Unknown summation: {0}")]
    UnknownSummation(SummationId),

    #[error("Statement {statement} of program '{program}' reads '{binding}' before it is bound")]
    ForwardReference {
        program: ProgramId,
        statement: usize,
        binding: BindingName,
    },

    #[error("Program '{program}' never binds its result '{binding}'")]
    UnboundResult {
        program: ProgramId,
        binding: BindingName,
    },

    #[error("Program '{0}' is invoked while it is already running")]
    CyclicInvocation(ProgramId),

    #[error("Variable {0} depends on itself")]
    CyclicVariable(VariableId),

    #[error("Invalid dice: {quantity}d{sides}")]
    InvalidDice { sides: i32, quantity: i32 },

    #[error("Roll needs {count} dice, at most {limit} are allowed")]
    TooManyDice { count: i64, limit: usize },

    #[error("Variable {0} has no value yet")]
    ValueNotSet(VariableId),

    #[error("Program '{program}' has no parameter {index}")]
    InvalidParameterIndex { program: ProgramId, index: usize },

    #[error("{count} parameters given, at most {max} are allowed")]
    TooManyParameters { count: usize, max: usize },

    #[error("Variable {0} does not keep a history")]
    HistoryUnsupported(VariableId),

    #[error("Variable {0} is already defined")]
    DuplicateVariable(VariableId),

    #[error("Evaluation exceeded the {what} depth limit of {limit}")]
    DepthExceeded { what: &'static str, limit: usize },
}

impl EngineError {
    pub(crate) fn signature(target: impl ToString, reason: impl Into<String>) -> Self {
        EngineError::TypeSignatureMismatch {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
