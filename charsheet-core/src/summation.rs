//! Summations: named totals built from number, dice and conditional terms.

use crate::environment::Environment;
use crate::error::EngineResult;
use crate::id::SummationId;
use crate::reference::{BooleanReference, DiceRollReference, NumberReference};
use crate::variable::VariableReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummationTerm {
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        value: NumberReference,
    },
    DiceRoll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        value: DiceRollReference,
    },
    Conditional {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        condition: BooleanReference,
        when_true: NumberReference,
        when_false: NumberReference,
    },
}

impl SummationTerm {
    pub fn number(value: NumberReference) -> Self {
        SummationTerm::Number { name: None, value }
    }

    pub fn dice_roll(value: DiceRollReference) -> Self {
        SummationTerm::DiceRoll { name: None, value }
    }

    pub fn conditional(condition: BooleanReference, when_true: NumberReference, when_false: NumberReference) -> Self {
        SummationTerm::Conditional {
            name: None,
            condition,
            when_true,
            when_false,
        }
    }

    pub fn named(mut self, term_name: impl Into<String>) -> Self {
        let slot = match &mut self {
            SummationTerm::Number { name, .. }
            | SummationTerm::DiceRoll { name, .. }
            | SummationTerm::Conditional { name, .. } => name,
        };
        *slot = Some(term_name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SummationTerm::Number { name, .. }
            | SummationTerm::DiceRoll { name, .. }
            | SummationTerm::Conditional { name, .. } => name.as_deref(),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            SummationTerm::Number { .. } => 0,
            SummationTerm::DiceRoll { .. } => 1,
            SummationTerm::Conditional { .. } => 2,
        }
    }

    /// Total order over terms: name (unnamed first), kind, then the term's
    /// canonical JSON form. Equal keys mean structurally equal terms.
    fn sort_key(&self) -> (Option<&str>, u8, String) {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        (self.name(), self.kind_rank(), canonical)
    }

    /// Evaluate the term. A conditional only resolves the branch it takes.
    pub fn evaluate(&self, env: &mut dyn Environment) -> EngineResult<f64> {
        match self {
            SummationTerm::Number { value, .. } => value.resolve(env),
            SummationTerm::DiceRoll { value, .. } => {
                let roll = value.resolve(env)?;
                env.roll(&roll)
            }
            SummationTerm::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } => {
                if condition.resolve(env)? {
                    when_true.resolve(env)
                } else {
                    when_false.resolve(env)
                }
            }
        }
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        match self {
            SummationTerm::Number { value, .. } => value.dependencies(),
            SummationTerm::DiceRoll { value, .. } => value.dependencies(),
            SummationTerm::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } => {
                let mut deps = condition.dependencies();
                deps.extend(when_true.dependencies());
                deps.extend(when_false.dependencies());
                deps
            }
        }
    }
}

/// Terms form a set kept in evaluation order, so two summations built from
/// the same terms compare equal and roll their dice in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SummationFields")]
pub struct Summation {
    pub id: SummationId,
    pub name: String,
    terms: Vec<SummationTerm>,
}

#[derive(Deserialize)]
struct SummationFields {
    id: SummationId,
    name: String,
    #[serde(default)]
    terms: Vec<SummationTerm>,
}

impl From<SummationFields> for Summation {
    fn from(fields: SummationFields) -> Self {
        fields
            .terms
            .into_iter()
            .fold(Summation::new(fields.id, fields.name), Summation::with_term)
    }
}

impl Summation {
    pub fn new(id: impl Into<SummationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            terms: Vec::new(),
        }
    }

    /// Add a term. Terms form a set: adding an equal term again is a no-op.
    pub fn with_term(mut self, term: SummationTerm) -> Self {
        let slot = {
            let key = term.sort_key();
            self.terms.binary_search_by(|t| t.sort_key().cmp(&key))
        };
        if let Err(pos) = slot {
            self.terms.insert(pos, term);
        }
        self
    }

    /// Terms in evaluation order: by name (unnamed first), then by kind,
    /// then by content.
    pub fn terms(&self) -> &[SummationTerm] {
        &self.terms
    }

    pub fn ordered_terms(&self) -> Vec<&SummationTerm> {
        self.terms.iter().collect()
    }

    pub fn evaluate(&self, env: &mut dyn Environment) -> EngineResult<f64> {
        let mut total = 0.0;
        for term in self.ordered_terms() {
            total += term.evaluate(env)?;
        }
        Ok(total)
    }

    pub fn dependencies(&self) -> BTreeSet<VariableReference> {
        self.terms.iter().flat_map(|t| t.dependencies()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceRoll;

    #[test]
    fn test_terms_are_a_set() {
        let s = Summation::new("ac", "Armor Class")
            .with_term(SummationTerm::number(NumberReference::Literal(10.0)))
            .with_term(SummationTerm::number(NumberReference::Literal(10.0)))
            .with_term(SummationTerm::number(NumberReference::Literal(10.0)).named("base"));
        assert_eq!(s.terms().len(), 2);
    }

    #[test]
    fn test_order_is_stable() {
        let s = Summation::new("dmg", "Damage")
            .with_term(SummationTerm::dice_roll(DiceRollReference::Literal(DiceRoll::new().with_dice(1, 8))).named("weapon"))
            .with_term(SummationTerm::number(NumberReference::Literal(3.0)).named("strength"))
            .with_term(SummationTerm::number(NumberReference::Literal(1.0)));
        let names: Vec<_> = s.ordered_terms().into_iter().map(|t| t.name()).collect();
        assert_eq!(names, vec![None, Some("strength"), Some("weapon")]);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let d4 = SummationTerm::dice_roll(DiceRollReference::Literal(DiceRoll::new().with_dice(1, 4)));
        let d20 = SummationTerm::dice_roll(DiceRollReference::Literal(DiceRoll::new().with_dice(1, 20)));
        let forward = Summation::new("s", "S").with_term(d4.clone()).with_term(d20.clone());
        let backward = Summation::new("s", "S").with_term(d20).with_term(d4);
        assert_eq!(forward, backward);
        assert_eq!(forward.ordered_terms(), backward.ordered_terms());
    }

    #[test]
    fn test_deserialize_keeps_set_order() {
        let json = serde_json::json!({
            "id": "s",
            "name": "S",
            "terms": [
                {"kind": "number", "value": {"literal": 2.0}},
                {"kind": "number", "value": {"literal": 1.0}},
                {"kind": "number", "value": {"literal": 2.0}}
            ]
        });
        let s: Summation = serde_json::from_value(json).unwrap();
        let built = Summation::new("s", "S")
            .with_term(SummationTerm::number(NumberReference::Literal(1.0)))
            .with_term(SummationTerm::number(NumberReference::Literal(2.0)));
        assert_eq!(s, built);
    }

    #[test]
    fn test_dependencies_cover_both_branches() {
        let term = SummationTerm::conditional(
            BooleanReference::Variable(VariableReference::id("proficient")),
            NumberReference::Variable(VariableReference::id("prof_bonus")),
            NumberReference::Literal(0.0),
        );
        assert_eq!(
            term.dependencies(),
            BTreeSet::from([VariableReference::id("prof_bonus"), VariableReference::id("proficient")])
        );
    }
}
