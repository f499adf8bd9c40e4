//! Dice rolls.
//!
//! A [`DiceRoll`] is a pure description: a set of dice quantities, a set of
//! flat modifiers and an optional name. Rolling it draws faces from a
//! caller-supplied [`DiceSource`], so the same roll resolved against the same
//! seeded source always produces the same total.
//!
//! Standard notation (`2d6+1d4+3`) is accepted by [`DiceRoll::parse`].

use crate::error::{EngineError, EngineResult};
use crate::value::format_number;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Most dice a single roll may draw unless the caller sets its own limit.
pub const DEFAULT_MAX_DICE: usize = 10_000;

/// Error type for dice notation parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(i32),
    #[error("No dice specified")]
    NoDice,
}

/// Source of die faces.
///
/// Implementations return a uniformly distributed face in `[1, sides]`.
/// Every [`rand::RngCore`] is a dice source.
pub trait DiceSource {
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<R: RngCore> DiceSource for R {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.gen_range(1..=sides)
    }
}

/// A number of dice with the same number of sides (e.g. the `2d6` in `2d6+3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiceQuantity {
    pub sides: i32,
    pub quantity: i32,
}

impl DiceQuantity {
    pub fn new(quantity: i32, sides: i32) -> Self {
        Self { sides, quantity }
    }

    fn validate(&self) -> EngineResult<()> {
        if self.sides < 1 || self.quantity < 0 {
            return Err(EngineError::InvalidDice {
                sides: self.sides,
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DiceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.quantity, self.sides)
    }
}

/// A flat modifier added to a roll, optionally named (e.g. "Strength").
///
/// Equality, ordering and hashing use the bit pattern of `value` so that
/// modifiers can live in ordered sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollModifier {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RollModifier {
    pub fn new(value: f64) -> Self {
        Self { value, name: None }
    }

    pub fn named(value: f64, name: impl Into<String>) -> Self {
        Self {
            value,
            name: Some(name.into()),
        }
    }
}

impl PartialEq for RollModifier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RollModifier {}

impl PartialOrd for RollModifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RollModifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl Hash for RollModifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.to_bits().hash(state);
        self.name.hash(state);
    }
}

/// A complete dice roll description.
///
/// Quantities and modifiers have set semantics: adding `2d6` twice leaves a
/// single `2d6`. Use one quantity with a larger count for more dice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceRoll {
    pub quantities: BTreeSet<DiceQuantity>,
    #[serde(default)]
    pub modifiers: BTreeSet<RollModifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DiceRoll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` dice with `sides` sides.
    pub fn with_dice(mut self, quantity: i32, sides: i32) -> Self {
        self.quantities.insert(DiceQuantity::new(quantity, sides));
        self
    }

    pub fn with_modifier(mut self, value: f64) -> Self {
        self.modifiers.insert(RollModifier::new(value));
        self
    }

    pub fn with_named_modifier(mut self, value: f64, name: impl Into<String>) -> Self {
        self.modifiers.insert(RollModifier::named(value, name));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a dice notation string such as `2d6+3` or `1d20 - 1`.
    ///
    /// Repeated dice of the same size are merged (`1d6+1d6` is `2d6`) and all
    /// flat numbers collapse into one unnamed modifier.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut counts: Vec<(i32, i32)> = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_component(&current, sign, &mut counts, &mut modifier)?;
                        current.clear();
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            Self::parse_component(&current, sign, &mut counts, &mut modifier)?;
        }

        if counts.is_empty() && modifier == 0 {
            return Err(DiceError::NoDice);
        }

        let mut roll = DiceRoll::new();
        for (sides, quantity) in counts {
            roll = roll.with_dice(quantity, sides);
        }
        if modifier != 0 {
            roll = roll.with_modifier(modifier as f64);
        }
        Ok(roll)
    }

    fn parse_component(
        s: &str,
        sign: i32,
        counts: &mut Vec<(i32, i32)>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        if let Some(d_pos) = s.find('d') {
            if sign < 0 {
                return Err(DiceError::InvalidNotation(format!("-{s}")));
            }
            let count_str = &s[..d_pos];
            let count: i32 = if count_str.is_empty() {
                1
            } else {
                count_str
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
            };

            let sides: i32 = s[d_pos + 1..]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            if sides < 1 {
                return Err(DiceError::InvalidDieSize(sides));
            }

            match counts.iter_mut().find(|(existing, _)| *existing == sides) {
                Some((_, quantity)) => {
                    *quantity = quantity
                        .checked_add(count)
                        .ok_or_else(|| DiceError::InvalidNotation(format!("too many d{sides}")))?;
                }
                None => counts.push((sides, count)),
            }
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            *modifier = modifier
                .checked_add(sign * value)
                .ok_or_else(|| DiceError::InvalidNotation(format!("modifier out of range at {s}")))?;
        }

        Ok(())
    }

    /// Sum of all modifier values.
    pub fn modifier_total(&self) -> f64 {
        self.modifiers.iter().map(|m| m.value).sum()
    }

    /// Check every quantity has at least one side and a non-negative count.
    pub fn validate(&self) -> EngineResult<()> {
        self.quantities.iter().try_for_each(DiceQuantity::validate)
    }

    /// Smallest and largest totals this roll can produce.
    pub fn range(&self) -> EngineResult<(f64, f64)> {
        self.validate()?;
        let modifiers = self.modifier_total();
        let (min, max) = self.quantities.iter().fold((0i64, 0i64), |(lo, hi), q| {
            (
                lo + q.quantity as i64,
                hi + q.quantity as i64 * q.sides as i64,
            )
        });
        Ok((min as f64 + modifiers, max as f64 + modifiers))
    }

    /// Total number of dice the roll draws.
    pub fn dice_count(&self) -> i64 {
        self.quantities.iter().map(|q| q.quantity as i64).sum()
    }

    /// Roll the dice and keep every face for display.
    ///
    /// Draws exactly `Σ quantity` faces, quantity by quantity in set order.
    /// Nothing is drawn when the roll is invalid or needs more than
    /// [`DEFAULT_MAX_DICE`] dice.
    pub fn roll_detailed(&self, dice: &mut dyn DiceSource) -> EngineResult<RollOutcome> {
        self.roll_detailed_limited(dice, DEFAULT_MAX_DICE)
    }

    /// Like [`roll_detailed`](Self::roll_detailed) with a caller-chosen
    /// limit on the number of dice.
    pub fn roll_detailed_limited(&self, dice: &mut dyn DiceSource, max_dice: usize) -> EngineResult<RollOutcome> {
        self.validate()?;
        let count = self.dice_count();
        if count > max_dice as i64 {
            return Err(EngineError::TooManyDice { count, limit: max_dice });
        }

        let components: Vec<ComponentResult> = self
            .quantities
            .iter()
            .map(|q| {
                let faces: Vec<u32> = (0..q.quantity)
                    .map(|_| dice.roll_die(q.sides as u32))
                    .collect();
                ComponentResult {
                    quantity: *q,
                    subtotal: faces.iter().map(|&f| f as i64).sum(),
                    faces,
                }
            })
            .collect();

        let modifier = self.modifier_total();
        let dice_total: i64 = components.iter().map(|c| c.subtotal).sum();

        Ok(RollOutcome {
            components,
            modifier,
            total: dice_total as f64 + modifier,
        })
    }

    /// Roll the dice and return the total.
    pub fn resolve(&self, dice: &mut dyn DiceSource) -> EngineResult<f64> {
        self.roll_detailed(dice).map(|outcome| outcome.total)
    }
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceRoll::parse(s)
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice = self
            .quantities
            .iter()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join("+");
        let modifier = self.modifier_total();

        match (dice.is_empty(), modifier) {
            (true, m) => f.write_str(&format_number(m)),
            (false, m) if m == 0.0 => f.write_str(&dice),
            (false, m) if m > 0.0 => write!(f, "{dice}+{}", format_number(m)),
            (false, m) => write!(f, "{dice}-{}", format_number(m.abs())),
        }
    }
}

/// Faces rolled for one dice quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub quantity: DiceQuantity,
    pub faces: Vec<u32>,
    pub subtotal: i64,
}

/// Complete result of rolling a [`DiceRoll`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub components: Vec<ComponentResult>,
    pub modifier: f64,
    pub total: f64,
}

impl RollOutcome {
    /// Format the individual faces for display, e.g. `[4, 5] + 3`.
    pub fn dice_display(&self) -> String {
        let dice_str = self
            .components
            .iter()
            .map(|c| {
                format!(
                    "[{}]",
                    c.faces
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join(" + ");

        match self.modifier {
            m if m == 0.0 => dice_str,
            m if dice_str.is_empty() => format_number(m),
            m if m > 0.0 => format!("{dice_str} + {}", format_number(m)),
            m => format!("{dice_str} - {}", format_number(m.abs())),
        }
    }
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), format_number(self.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_faces_scenario() {
        let roll = DiceRoll::new().with_dice(2, 6).with_modifier(3.0);
        let mut dice = ScriptedDice::new([4, 5]);
        assert_eq!(roll.resolve(&mut dice).unwrap(), 12.0);
        assert_eq!(dice.requests(), &[6, 6]);
    }

    #[test]
    fn test_empty_roll_is_modifier_sum() {
        let roll = DiceRoll::new()
            .with_named_modifier(2.0, "Strength")
            .with_named_modifier(1.0, "Proficiency");
        let mut dice = ScriptedDice::new([]);
        assert_eq!(roll.resolve(&mut dice).unwrap(), 3.0);
        assert!(dice.requests().is_empty());
    }

    #[test]
    fn test_invalid_dice() {
        let mut dice = ScriptedDice::new([1, 1, 1]);
        let zero_sides = DiceRoll::new().with_dice(1, 0);
        assert_eq!(
            zero_sides.resolve(&mut dice),
            Err(EngineError::InvalidDice {
                sides: 0,
                quantity: 1
            })
        );
        let negative = DiceRoll::new().with_dice(-1, 6).with_dice(2, 8);
        assert!(negative.resolve(&mut dice).is_err());
        // Validation happens before any face is drawn
        assert!(dice.requests().is_empty());
    }

    #[test]
    fn test_zero_quantity_is_legal() {
        let roll = DiceRoll::new().with_dice(0, 6).with_modifier(1.0);
        let mut dice = ScriptedDice::new([]);
        assert_eq!(roll.resolve(&mut dice).unwrap(), 1.0);
    }

    #[test]
    fn test_roll_range_law() {
        let mut rng = StdRng::seed_from_u64(7);
        let roll = DiceRoll::new()
            .with_dice(3, 6)
            .with_dice(1, 20)
            .with_modifier(-2.0);
        let (min, max) = roll.range().unwrap();
        assert_eq!((min, max), (2.0, 36.0));
        for _ in 0..200 {
            let total = roll.resolve(&mut rng).unwrap();
            assert!(total >= min && total <= max);
        }
    }

    #[test]
    fn test_seeded_rolls_are_reproducible() {
        let roll = DiceRoll::new().with_dice(4, 6);
        let a = roll.resolve(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = roll.resolve(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_semantics() {
        let roll = DiceRoll::new().with_dice(2, 6).with_dice(2, 6);
        assert_eq!(roll.quantities.len(), 1);

        let roll = DiceRoll::new().with_modifier(1.0).with_modifier(1.0);
        assert_eq!(roll.modifier_total(), 1.0);
    }

    #[test]
    fn test_parse() {
        let roll = DiceRoll::parse("2d6+1d4+3").unwrap();
        assert_eq!(roll.quantities.len(), 2);
        assert_eq!(roll.modifier_total(), 3.0);

        let roll = DiceRoll::parse("1d20 - 2").unwrap();
        assert_eq!(roll.modifier_total(), -2.0);

        let roll = DiceRoll::parse("d8").unwrap();
        assert!(roll.quantities.contains(&DiceQuantity::new(1, 8)));

        let roll = DiceRoll::parse("1d6+1d6").unwrap();
        assert!(roll.quantities.contains(&DiceQuantity::new(2, 6)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(DiceRoll::parse(""), Err(DiceError::NoDice)));
        assert!(matches!(
            DiceRoll::parse("2dx"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceRoll::parse("1d0"),
            Err(DiceError::InvalidDieSize(0))
        ));
        assert!(DiceRoll::parse("5-1d4").is_err());
    }

    #[test]
    fn test_parse_overflow_is_an_error() {
        assert!(matches!(
            DiceRoll::parse("2000000000d6+2000000000d6"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceRoll::parse("2000000000+2000000000"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceRoll::parse("1d4-2000000000-2000000000"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert_eq!(DiceRoll::parse("1000000000d6+1000000000d6").unwrap().dice_count(), 2_000_000_000);
    }

    #[test]
    fn test_dice_limit() {
        let mut dice = ScriptedDice::new([]);
        let huge = DiceRoll::parse("2000000000d6").unwrap();
        assert_eq!(
            huge.resolve(&mut dice),
            Err(EngineError::TooManyDice {
                count: 2_000_000_000,
                limit: DEFAULT_MAX_DICE,
            })
        );
        assert!(dice.requests().is_empty());

        let mut dice = ScriptedDice::new([1, 2, 3]);
        let three = DiceRoll::new().with_dice(3, 6);
        assert_eq!(
            three.roll_detailed_limited(&mut dice, 2),
            Err(EngineError::TooManyDice { count: 3, limit: 2 })
        );
        assert_eq!(three.roll_detailed_limited(&mut dice, 3).map(|o| o.total), Ok(6.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceRoll::parse("2d6+3").unwrap().to_string(), "2d6+3");
        assert_eq!(DiceRoll::parse("1d20-1").unwrap().to_string(), "1d20-1");
        assert_eq!(DiceRoll::new().with_modifier(4.0).to_string(), "4");

        let roll = DiceRoll::new().with_dice(2, 6).with_modifier(3.0);
        let outcome = roll.roll_detailed(&mut ScriptedDice::new([4, 5])).unwrap();
        assert_eq!(outcome.to_string(), "[4, 5] + 3 = 12");
    }
}
