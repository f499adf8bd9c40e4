//! Rules engine for tabletop RPG character sheets.
//!
//! This crate provides:
//! - A typed value model and dice rolls with an explicit random source
//! - Sheet variables with typed references, tags and history
//! - Value sets, summations, tuple-tabulated functions and programs
//! - An evaluator with cycle detection and depth limits
//! - Rulebook/sheet document decoding and sheet persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use charsheet_core::{persist, Sheet, VariableId};
//! use rand::SeedableRng;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rulebook = Arc::new(persist::load_rulebook("rulebook.json").await?);
//!     let sheet = persist::load_sheet("fighter.json", rulebook).await?;
//!
//!     let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!     let ac = sheet.value(&VariableId::new("armor_class"), &mut rng)?;
//!     println!("AC {ac}");
//!     Ok(())
//! }
//! ```

pub mod dice;
pub mod engine;
pub mod environment;
pub mod error;
pub mod function;
pub mod id;
pub mod mechanic;
pub mod persist;
pub mod program;
pub mod reference;
pub mod rulebook;
pub mod schema;
pub mod sheet;
pub mod store;
pub mod summation;
pub mod testing;
pub mod value;
pub mod value_set;
pub mod variable;

// Primary public API
pub use dice::{DiceError, DiceRoll, DiceSource, RollOutcome};
pub use engine::{ConformanceReport, EngineConfig, Evaluator};
pub use environment::Environment;
pub use error::{EngineError, EngineResult};
pub use function::{Function, Tuple, TypeSignature};
pub use id::{
    BindingName, FunctionId, MechanicCategoryId, MechanicId, ProgramId, SheetId, SummationId, ValueId, ValueSetId,
};
pub use mechanic::Mechanic;
pub use program::{Invocation, Program, Statement, StatementParameter};
pub use reference::{BooleanReference, DataReference, DiceRollReference, NumberReference};
pub use rulebook::{Rulebook, RulebookReference};
pub use schema::{DecodeError, FromDocument};
pub use sheet::{Sheet, SheetReport};
pub use store::VariableStore;
pub use summation::{Summation, SummationTerm};
pub use value::{EngineValue, EngineValueType};
pub use value_set::{Value, ValueReference, ValueSet, ValueSetRegistry};
pub use variable::{Variable, VariableId, VariableReference, VariableTag, VariableValue};
