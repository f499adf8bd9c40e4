//! The immutable rule content of one game.
//!
//! A [`Rulebook`] is loaded once and shared read-only (behind an `Arc`) by
//! every sheet that plays by it.

use crate::error::{EngineError, EngineResult};
use crate::function::Function;
use crate::id::{FunctionId, MechanicId, ProgramId, SummationId, ValueSetId};
use crate::mechanic::Mechanic;
use crate::program::Program;
use crate::summation::Summation;
use crate::value_set::{ValueSet, ValueSetRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Where in the printed rulebook something is described.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RulebookReference {
    pub chapter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
}

impl RulebookReference {
    pub fn chapter(chapter: impl Into<String>) -> Self {
        Self {
            chapter: chapter.into(),
            section: None,
            subsection: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_subsection(mut self, subsection: impl Into<String>) -> Self {
        self.subsection = Some(subsection.into());
        self
    }
}

impl fmt::Display for RulebookReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chapter)?;
        if let Some(section) = &self.section {
            write!(f, " > {section}")?;
        }
        if let Some(subsection) = &self.subsection {
            write!(f, " > {subsection}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rulebook {
    pub name: String,
    pub value_sets: ValueSetRegistry,
    functions: HashMap<FunctionId, Function>,
    programs: HashMap<ProgramId, Program>,
    summations: HashMap<SummationId, Summation>,
    /// Kept in declaration order so activation is deterministic.
    mechanics: Vec<Mechanic>,
}

impl Rulebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_value_set(mut self, set: ValueSet) -> Self {
        self.add_value_set(set);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.add_function(function);
        self
    }

    pub fn with_program(mut self, program: Program) -> Self {
        self.add_program(program);
        self
    }

    pub fn with_summation(mut self, summation: Summation) -> Self {
        self.add_summation(summation);
        self
    }

    pub fn with_mechanic(mut self, mechanic: Mechanic) -> Self {
        self.add_mechanic(mechanic);
        self
    }

    pub fn add_value_set(&mut self, set: ValueSet) {
        self.value_sets.insert(set);
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.insert(function.id.clone(), function);
    }

    pub fn add_program(&mut self, program: Program) {
        self.programs.insert(program.id.clone(), program);
    }

    pub fn add_summation(&mut self, summation: Summation) {
        self.summations.insert(summation.id.clone(), summation);
    }

    /// Add a mechanic, replacing any earlier one with the same id in place.
    pub fn add_mechanic(&mut self, mechanic: Mechanic) {
        match self.mechanics.iter_mut().find(|m| m.id == mechanic.id) {
            Some(existing) => *existing = mechanic,
            None => self.mechanics.push(mechanic),
        }
    }

    pub fn value_set(&self, id: &ValueSetId) -> EngineResult<&ValueSet> {
        self.value_sets.get(id)
    }

    pub fn function(&self, id: &FunctionId) -> EngineResult<&Function> {
        self.functions
            .get(id)
            .ok_or_else(|| EngineError::UnknownFunction(id.clone()))
    }

    pub fn program(&self, id: &ProgramId) -> EngineResult<&Program> {
        self.programs
            .get(id)
            .ok_or_else(|| EngineError::UnknownProgram(id.clone()))
    }

    pub fn summation(&self, id: &SummationId) -> EngineResult<&Summation> {
        self.summations
            .get(id)
            .ok_or_else(|| EngineError::UnknownSummation(id.clone()))
    }

    pub fn mechanic(&self, id: &MechanicId) -> Option<&Mechanic> {
        self.mechanics.iter().find(|m| &m.id == id)
    }

    pub fn has_function(&self, id: &FunctionId) -> bool {
        self.functions.contains_key(id)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn summations(&self) -> impl Iterator<Item = &Summation> {
        self.summations.values()
    }

    pub fn mechanics(&self) -> &[Mechanic] {
        &self.mechanics
    }
}
