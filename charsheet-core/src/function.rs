//! Tuple-tabulated functions.
//!
//! A function is a finite table: each tuple maps a list of parameter values
//! to a result. Applying a function type-checks the arguments against its
//! signature, then returns the result of the first tuple whose parameters
//! equal the arguments exactly.

use crate::error::{EngineError, EngineResult};
use crate::id::FunctionId;
use crate::value::{EngineValue, EngineValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most parameters a function, program or statement may take.
pub const MAX_PARAMETERS: usize = 5;

/// Parameter types and result type of a function or program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSignature {
    pub parameters: Vec<EngineValueType>,
    pub result: EngineValueType,
}

impl TypeSignature {
    pub fn new(parameters: impl Into<Vec<EngineValueType>>, result: EngineValueType) -> Self {
        Self {
            parameters: parameters.into(),
            result,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Check arity and parameter types of `args`. `target` names the
    /// function or program in the error.
    pub fn check_arguments(&self, target: &dyn fmt::Display, args: &[EngineValue]) -> EngineResult<()> {
        if args.len() > MAX_PARAMETERS {
            return Err(EngineError::TooManyParameters {
                count: args.len(),
                max: MAX_PARAMETERS,
            });
        }
        if args.len() != self.parameters.len() {
            return Err(EngineError::signature(
                target,
                format!("expected {} arguments, got {}", self.parameters.len(), args.len()),
            ));
        }
        for (i, (expected, arg)) in self.parameters.iter().zip(args).enumerate() {
            if arg.value_type() != *expected {
                return Err(EngineError::signature(
                    target,
                    format!("parameter {} expects {}, got {}", i + 1, expected, arg.value_type()),
                ));
            }
        }
        Ok(())
    }

    pub fn check_result(&self, target: &dyn fmt::Display, result: &EngineValue) -> EngineResult<()> {
        if result.value_type() != self.result {
            return Err(EngineError::signature(
                target,
                format!("result should be {}, got {}", self.result, result.value_type()),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|t| t.to_string()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.result)
    }
}

/// One row of a function table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub parameters: Vec<EngineValue>,
    pub result: EngineValue,
}

impl Tuple {
    pub fn new(parameters: impl Into<Vec<EngineValue>>, result: impl Into<EngineValue>) -> Self {
        Self {
            parameters: parameters.into(),
            result: result.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub signature: TypeSignature,
    tuples: Vec<Tuple>,
}

impl Function {
    pub fn new(id: impl Into<FunctionId>, signature: TypeSignature) -> Self {
        let id = id.into();
        Self {
            label: id.to_string(),
            id,
            description: String::new(),
            signature,
            tuples: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a tuple. Earlier tuples take precedence when several match.
    pub fn with_tuple(mut self, tuple: Tuple) -> Self {
        self.tuples.push(tuple);
        self
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Check every tuple against the signature.
    pub fn validate(&self) -> EngineResult<()> {
        for tuple in &self.tuples {
            self.signature.check_arguments(&self.id, &tuple.parameters)?;
            self.signature.check_result(&self.id, &tuple.result)?;
        }
        Ok(())
    }

    pub fn apply(&self, args: &[EngineValue]) -> EngineResult<EngineValue> {
        self.signature.check_arguments(&self.id, args)?;
        self.tuples
            .iter()
            .find(|tuple| tuple.parameters == args)
            .map(|tuple| tuple.result.clone())
            .ok_or_else(|| EngineError::NoMatchingTuple(self.id.clone()))
    }
}
