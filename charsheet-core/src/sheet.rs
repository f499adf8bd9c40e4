//! Character sheets.
//!
//! A [`Sheet`] pairs one character's variable store with the rulebook it is
//! played under. Reads build a short-lived [`Evaluator`]; writes go straight
//! to the store.

use crate::dice::DiceSource;
use crate::engine::{EngineConfig, Evaluator};
use crate::error::{EngineError, EngineResult};
use crate::id::{MechanicId, SheetId};
use crate::rulebook::Rulebook;
use crate::store::VariableStore;
use crate::value::EngineValue;
use crate::variable::{HistoryEntry, NumberVariableValue, Variable, VariableId, VariableValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Sheet {
    pub id: SheetId,
    rulebook: Arc<Rulebook>,
    store: VariableStore,
    config: EngineConfig,
}

impl Sheet {
    pub fn new(rulebook: Arc<Rulebook>) -> Self {
        Self::with_store(rulebook, VariableStore::new())
    }

    pub fn with_store(rulebook: Arc<Rulebook>, store: VariableStore) -> Self {
        Self {
            id: SheetId::new(),
            rulebook,
            store,
            config: EngineConfig::default(),
        }
    }

    pub fn with_id(mut self, id: SheetId) -> Self {
        self.id = id;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn insert(&mut self, variable: Variable) -> EngineResult<()> {
        self.store.insert(variable)
    }

    /// An evaluator over this sheet, for callers that need more than one
    /// read with the same dice.
    pub fn evaluator<'a>(&'a self, dice: &'a mut dyn DiceSource) -> Evaluator<'a> {
        Evaluator::new(&self.rulebook, &self.store, dice).with_config(self.config)
    }

    /// Evaluate one variable.
    pub fn value(&self, id: &VariableId, dice: &mut dyn DiceSource) -> EngineResult<EngineValue> {
        self.evaluator(dice).evaluate_variable(id)
    }

    /// Evaluate every variable. A failing variable is recorded in the
    /// report and does not stop the others.
    pub fn evaluate_all(&self, dice: &mut dyn DiceSource) -> SheetReport {
        let mut evaluator = self.evaluator(dice);
        let mut results = BTreeMap::new();
        for id in self.store.ids() {
            let result = evaluator.evaluate_variable(id);
            if let Err(e) = &result {
                warn!(sheet = %self.id, variable = %id, error = %e, "Variable failed to evaluate");
            }
            results.insert(id.clone(), result);
        }
        SheetReport { results }
    }

    pub fn set(&mut self, id: &VariableId, value: VariableValue) -> EngineResult<()> {
        self.store.set(id, value)
    }

    pub fn append_history(&mut self, id: &VariableId, entry: HistoryEntry) -> EngineResult<()> {
        self.store.append_history(id, entry)
    }

    /// Set a number variable to a literal and record the change in its
    /// history.
    pub fn assign_number(&mut self, id: &VariableId, value: f64, description: Option<String>) -> EngineResult<()> {
        let literal = NumberVariableValue::Literal(value);
        self.store.set(id, VariableValue::Number(literal.clone()))?;
        let mut entry = HistoryEntry::new(literal);
        entry.description = description;
        self.store.append_history(id, entry)
    }

    /// Add the variables of every mechanic whose requirements hold.
    ///
    /// Variables already on the sheet are left as they are. A mechanic
    /// whose requirements fail to evaluate is skipped. Returns the ids of
    /// the active mechanics in rulebook order.
    pub fn activate_mechanics(&mut self, dice: &mut dyn DiceSource) -> Vec<MechanicId> {
        let rulebook = Arc::clone(&self.rulebook);
        let active: Vec<_> = {
            let mut evaluator = self.evaluator(dice);
            rulebook
                .mechanics()
                .iter()
                .filter(|mechanic| match mechanic.is_active(&mut evaluator) {
                    Ok(active) => active,
                    Err(e) => {
                        warn!(mechanic = %mechanic.id, error = %e, "Mechanic requirements failed to evaluate");
                        false
                    }
                })
                .collect()
        };

        for mechanic in &active {
            for variable in &mechanic.variables {
                match self.store.insert(variable.clone()) {
                    Ok(()) => debug!(mechanic = %mechanic.id, variable = %variable.id, "Added variable"),
                    Err(EngineError::DuplicateVariable(_)) => {}
                    Err(e) => warn!(mechanic = %mechanic.id, error = %e, "Failed to add variable"),
                }
            }
        }
        active.into_iter().map(|m| m.id.clone()).collect()
    }
}

/// Result of evaluating every variable on a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    results: BTreeMap<VariableId, EngineResult<EngineValue>>,
}

impl SheetReport {
    pub fn get(&self, id: &VariableId) -> Option<&EngineResult<EngineValue>> {
        self.results.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariableId, &EngineResult<EngineValue>)> {
        self.results.iter()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&VariableId, &EngineValue)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().ok().map(|v| (id, v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&VariableId, &EngineError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id, e)))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
