//! The per-sheet variable store.
//!
//! The store owns a sheet's variables. Values change only through [`set`]
//! and [`append_history`]; both check the variable's type first.
//!
//! [`set`]: VariableStore::set
//! [`append_history`]: VariableStore::append_history

use crate::error::{EngineError, EngineResult};
use crate::id::ProgramId;
use crate::rulebook::Rulebook;
use crate::variable::{
    BooleanVariableValue, HistoryEntry, NumberVariableValue, TextVariableValue, Variable, VariableId,
    VariableReference, VariableTag, VariableValue,
};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: HashMap<VariableId, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded variables. Ids must be unique.
    pub fn from_variables(variables: impl IntoIterator<Item = Variable>) -> EngineResult<Self> {
        let mut store = Self::new();
        for variable in variables {
            store.insert(variable)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, variable: Variable) -> EngineResult<()> {
        if self.variables.contains_key(&variable.id) {
            return Err(EngineError::DuplicateVariable(variable.id));
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    pub fn contains(&self, id: &VariableId) -> bool {
        self.variables.contains_key(id)
    }

    pub fn get(&self, id: &VariableId) -> EngineResult<&Variable> {
        self.variables
            .get(id)
            .ok_or_else(|| EngineError::UnknownVariable(id.clone()))
    }

    /// Replace a variable's current value. The new value must have the
    /// variable's type; history is left untouched.
    pub fn set(&mut self, id: &VariableId, value: VariableValue) -> EngineResult<()> {
        self.get_mut(id)?.assign(value)
    }

    /// Append an entry to a number variable's history.
    pub fn append_history(&mut self, id: &VariableId, entry: HistoryEntry) -> EngineResult<()> {
        self.get_mut(id)?.append_history(entry)
    }

    fn get_mut(&mut self, id: &VariableId) -> EngineResult<&mut Variable> {
        self.variables
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownVariable(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variable ids in sorted order.
    pub fn ids(&self) -> Vec<&VariableId> {
        let mut ids: Vec<_> = self.variables.keys().collect();
        ids.sort();
        ids
    }

    /// Variables in id order.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<_> = self.variables.values().collect();
        vars.sort_by(|a, b| a.id.cmp(&b.id));
        vars
    }

    /// Every variable carrying `tag`, in id order.
    pub fn tagged(&self, tag: &VariableTag) -> Vec<&Variable> {
        let mut vars: Vec<_> = self.variables.values().filter(|v| v.has_tag(tag)).collect();
        vars.sort_by(|a, b| a.id.cmp(&b.id));
        vars
    }

    /// Every variable `reference` names. An id that is not defined is an
    /// error; a tag may match nothing.
    pub fn resolve(&self, reference: &VariableReference) -> EngineResult<Vec<&Variable>> {
        match reference {
            VariableReference::Id(id) => Ok(vec![self.get(id)?]),
            VariableReference::Tag(tag) => Ok(self.tagged(tag)),
        }
    }

    /// The single variable `reference` names.
    pub fn resolve_single(&self, reference: &VariableReference) -> EngineResult<&Variable> {
        match reference {
            VariableReference::Id(id) => self.get(id),
            VariableReference::Tag(tag) => {
                let mut matches = self.tagged(tag);
                if matches.len() == 1 {
                    Ok(matches.remove(0))
                } else {
                    Err(EngineError::AmbiguousReference {
                        tag: tag.clone(),
                        matches: matches.len(),
                    })
                }
            }
        }
    }

    /// Variables `id` reads, including those read inside the summations and
    /// programs its value refers to.
    pub fn dependencies(&self, id: &VariableId, rulebook: &Rulebook) -> EngineResult<BTreeSet<VariableId>> {
        let variable = self.get(id)?;
        let mut references = variable.dependencies();
        match variable.value() {
            VariableValue::Number(NumberVariableValue::Summation(summation)) => {
                if let Ok(summation) = rulebook.summation(summation) {
                    references.extend(summation.dependencies());
                }
            }
            VariableValue::Number(NumberVariableValue::Program(invocation))
            | VariableValue::Text(TextVariableValue::Program(invocation))
            | VariableValue::Boolean(BooleanVariableValue::Program(invocation)) => {
                references.extend(program_dependencies(&invocation.program_id, rulebook));
            }
            _ => {}
        }

        let mut ids = BTreeSet::new();
        for reference in &references {
            match reference {
                VariableReference::Id(dep) => {
                    ids.insert(dep.clone());
                }
                VariableReference::Tag(tag) => {
                    ids.extend(self.tagged(tag).into_iter().map(|v| v.id.clone()));
                }
            }
        }
        Ok(ids)
    }

    /// Find a dependency cycle through `id`, if there is one.
    ///
    /// Returns the cycle as a path starting and ending at the same variable.
    /// Dependencies on undefined variables are ignored here; evaluation
    /// reports them.
    pub fn find_cycle(&self, id: &VariableId, rulebook: &Rulebook) -> Option<Vec<VariableId>> {
        let mut path = Vec::new();
        let mut done = HashSet::new();
        self.visit(id, rulebook, &mut path, &mut done)
    }

    fn visit(
        &self,
        id: &VariableId,
        rulebook: &Rulebook,
        path: &mut Vec<VariableId>,
        done: &mut HashSet<VariableId>,
    ) -> Option<Vec<VariableId>> {
        if let Some(start) = path.iter().position(|p| p == id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(id.clone());
            return Some(cycle);
        }
        if done.contains(id) {
            return None;
        }
        let deps = self.dependencies(id, rulebook).ok()?;
        path.push(id.clone());
        for dep in &deps {
            if let Some(cycle) = self.visit(dep, rulebook, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(id.clone());
        None
    }
}

/// Variables read by a program's statements and by any program its
/// statements call, transitively.
fn program_dependencies(program_id: &ProgramId, rulebook: &Rulebook) -> BTreeSet<VariableReference> {
    let mut deps = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut pending = vec![program_id.clone()];
    while let Some(id) = pending.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Ok(program) = rulebook.program(&id) else {
            continue;
        };
        deps.extend(program.dependencies());
        for statement in program.statements() {
            if !rulebook.has_function(&statement.function_id) {
                pending.push(ProgramId::new(statement.function_id.as_str()));
            }
        }
    }
    deps
}
