//! Mechanics: rule features a sheet gains once its requirements hold.

use crate::environment::Environment;
use crate::error::EngineResult;
use crate::id::{MechanicCategoryId, MechanicId};
use crate::variable::{Variable, VariableId, VariableReference};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mechanic {
    pub id: MechanicId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<MechanicCategoryId>,
    /// Boolean variables that must all be true for the mechanic to apply.
    #[serde(default)]
    pub requirements: Vec<VariableId>,
    /// Variables the sheet gains when the mechanic applies.
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Mechanic {
    pub fn new(id: impl Into<MechanicId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            summary: String::new(),
            category_id: None,
            requirements: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<MechanicCategoryId>) -> Self {
        self.category_id = Some(category.into());
        self
    }

    pub fn with_requirement(mut self, id: impl Into<VariableId>) -> Self {
        self.requirements.push(id.into());
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Whether every requirement evaluates to `true`. Stops at the first
    /// requirement that is false or fails.
    pub fn is_active(&self, env: &mut dyn Environment) -> EngineResult<bool> {
        for requirement in &self.requirements {
            let reference = VariableReference::Id(requirement.clone());
            if !env.variable(&reference)?.into_boolean()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
