//! Programs: straight-line sequences of function applications.
//!
//! Each statement applies a function to up to five parameters and binds the
//! result to a name. Parameters are earlier bindings, 1-based indices into
//! the program's own arguments, or data references. A program's result is
//! whatever its result binding holds once every statement has run.

use crate::environment::Environment;
use crate::error::{EngineError, EngineResult};
use crate::function::{TypeSignature, MAX_PARAMETERS};
use crate::id::{BindingName, FunctionId, ProgramId};
use crate::reference::DataReference;
use crate::value::EngineValue;
use crate::variable::VariableReference;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementParameter {
    /// A name bound by an earlier statement.
    Binding(BindingName),
    /// A 1-based index into the program's arguments.
    ProgramParameter(usize),
    Reference(DataReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub binding: BindingName,
    pub function_id: FunctionId,
    pub parameters: Vec<StatementParameter>,
}

impl Statement {
    pub fn new(binding: impl Into<BindingName>, function_id: impl Into<FunctionId>) -> Self {
        Self {
            binding: binding.into(),
            function_id: function_id.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: StatementParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_binding(self, name: impl Into<BindingName>) -> Self {
        self.with_parameter(StatementParameter::Binding(name.into()))
    }

    pub fn with_program_parameter(self, index: usize) -> Self {
        self.with_parameter(StatementParameter::ProgramParameter(index))
    }

    pub fn with_reference(self, reference: impl Into<DataReference>) -> Self {
        self.with_parameter(StatementParameter::Reference(reference.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub signature: TypeSignature,
    statements: Vec<Statement>,
    pub result_binding: BindingName,
}

impl Program {
    pub fn new(id: impl Into<ProgramId>, signature: TypeSignature, result_binding: impl Into<BindingName>) -> Self {
        let id = id.into();
        Self {
            label: id.to_string(),
            id,
            description: String::new(),
            signature,
            statements: Vec::new(),
            result_binding: result_binding.into(),
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

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Statements that read a binding no earlier statement has made, as
    /// `(statement index, binding)` pairs. A well-formed program has none.
    pub fn forward_references(&self) -> Vec<(usize, BindingName)> {
        let mut bound: HashSet<&BindingName> = HashSet::new();
        let mut found = Vec::new();
        for (i, statement) in self.statements.iter().enumerate() {
            for parameter in &statement.parameters {
                if let StatementParameter::Binding(name) = parameter {
                    if !bound.contains(name) {
                        found.push((i, name.clone()));
                    }
                }
            }
            bound.insert(&statement.binding);
        }
        found
    }

    /// Variables read by the statements' data references.
    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        self.statements
            .iter()
            .flat_map(|s| s.parameters.iter())
            .filter_map(|p| match p {
                StatementParameter::Reference(r) => Some(r.dependencies()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Run the program on `args`.
    ///
    /// Arguments are checked against the signature first. Statements run in
    /// order; a later statement binding an existing name replaces it.
    pub fn execute(&self, args: &[EngineValue], env: &mut dyn Environment) -> EngineResult<EngineValue> {
        self.signature.check_arguments(&self.id, args)?;

        let mut bindings: HashMap<BindingName, EngineValue> = HashMap::new();
        for (i, statement) in self.statements.iter().enumerate() {
            if statement.parameters.len() > MAX_PARAMETERS {
                return Err(EngineError::TooManyParameters {
                    count: statement.parameters.len(),
                    max: MAX_PARAMETERS,
                });
            }
            let mut values = Vec::with_capacity(statement.parameters.len());
            for parameter in &statement.parameters {
                let value = match parameter {
                    StatementParameter::Binding(name) => bindings
                        .get(name)
                        .cloned()
                        .ok_or_else(|| EngineError::ForwardReference {
                            program: self.id.clone(),
                            statement: i,
                            binding: name.clone(),
                        })?,
                    StatementParameter::ProgramParameter(index) => index
                        .checked_sub(1)
                        .and_then(|pos| args.get(pos))
                        .cloned()
                        .ok_or_else(|| EngineError::InvalidParameterIndex {
                            program: self.id.clone(),
                            index: *index,
                        })?,
                    StatementParameter::Reference(reference) => reference.resolve(env)?,
                };
                values.push(value);
            }
            let result = env.apply(&statement.function_id, values)?;
            debug!(program = %self.id, binding = %statement.binding, value = %result, "Statement bound");
            bindings.insert(statement.binding.clone(), result);
        }

        let result = bindings
            .remove(&self.result_binding)
            .ok_or_else(|| EngineError::UnboundResult {
                program: self.id.clone(),
                binding: self.result_binding.clone(),
            })?;
        self.signature.check_result(&self.id, &result)?;
        Ok(result)
    }
}

/// A call to a program with data references as arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub program_id: ProgramId,
    #[serde(default)]
    pub arguments: Vec<DataReference>,
}

impl Invocation {
    pub fn new(program_id: impl Into<ProgramId>) -> Self {
        Self {
            program_id: program_id.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<DataReference>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Resolve every argument, in order.
    pub fn resolve_arguments(&self, env: &mut dyn Environment) -> EngineResult<Vec<EngineValue>> {
        if self.arguments.len() > MAX_PARAMETERS {
            return Err(EngineError::TooManyParameters {
                count: self.arguments.len(),
                max: MAX_PARAMETERS,
            });
        }
        self.arguments.iter().map(|arg| arg.resolve(env)).collect()
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        self.arguments.iter().flat_map(|a| a.dependencies()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EngineValueType;

    fn numbers(n: usize) -> TypeSignature {
        TypeSignature::new(vec![EngineValueType::Number; n], EngineValueType::Number)
    }

    #[test]
    fn test_forward_references() {
        let good = Program::new("p", numbers(2), "b2")
            .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(2))
            .with_statement(Statement::new("b2", "add2").with_binding("b1").with_reference(1.0));
        assert!(good.forward_references().is_empty());

        let bad = Program::new("p", numbers(2), "b2")
            .with_statement(Statement::new("b1", "add2").with_binding("b2").with_program_parameter(1))
            .with_statement(Statement::new("b2", "add2").with_binding("b1").with_binding("b1"));
        assert_eq!(bad.forward_references(), vec![(0, BindingName::new("b2"))]);
    }

    #[test]
    fn test_self_read_is_forward_reference() {
        let program = Program::new("p", numbers(1), "b1")
            .with_statement(Statement::new("b1", "add2").with_binding("b1").with_program_parameter(1));
        assert_eq!(program.forward_references(), vec![(0, BindingName::new("b1"))]);
    }

    #[test]
    fn test_dependencies() {
        use crate::reference::NumberReference;
        let program = Program::new("p", numbers(0), "b1").with_statement(
            Statement::new("b1", "add2")
                .with_reference(DataReference::Number(NumberReference::Variable(VariableReference::id("str"))))
                .with_reference(2.0),
        );
        assert_eq!(program.dependencies(), BTreeSet::from([VariableReference::id("str")]));
    }

    #[test]
    fn test_invocation_dependencies() {
        use crate::reference::BooleanReference;
        let invocation = Invocation::new("p")
            .with_argument(1.0)
            .with_argument(DataReference::Boolean(BooleanReference::Variable(VariableReference::tag("proficiency"))));
        assert_eq!(
            invocation.dependencies(),
            BTreeSet::from([VariableReference::tag("proficiency")])
        );
    }
}
