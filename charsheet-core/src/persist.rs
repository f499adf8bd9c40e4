//! Sheet persistence and document loading.
//!
//! Sheets are snapshotted as pretty JSON of their variables (values and
//! histories included). Rulebooks and hand-written sheets are read from
//! documents through the [`schema`](crate::schema) decoder.

use crate::error::EngineError;
use crate::id::SheetId;
use crate::rulebook::Rulebook;
use crate::schema::{self, DecodeError};
use crate::sheet::Sheet;
use crate::store::VariableStore;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid sheet: {0}")]
    Engine(#[from] EngineError),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved character sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSheet {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created, in seconds since the Unix epoch.
    pub saved_at: String,

    pub sheet_id: SheetId,

    /// Name of the rulebook the sheet was played under.
    #[serde(default)]
    pub rulebook: String,

    /// Every variable on the sheet, in id order.
    pub variables: Vec<Variable>,
}

impl SavedSheet {
    pub fn new(sheet: &Sheet) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: chrono_now(),
            sheet_id: sheet.id,
            rulebook: sheet.rulebook().name.clone(),
            variables: sheet.store().variables().into_iter().cloned().collect(),
        }
    }

    /// Rebuild the sheet under `rulebook`.
    pub fn into_sheet(self, rulebook: Arc<Rulebook>) -> Result<Sheet, PersistError> {
        let store = VariableStore::from_variables(self.variables)?;
        Ok(Sheet::with_store(rulebook, store).with_id(self.sheet_id))
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).await?;
        debug!(sheet = %self.sheet_id, path = %path.as_ref().display(), "Saved sheet");
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }
}

/// Create a save file name for a sheet.
pub fn sheet_save_path(dir: impl AsRef<Path>, sheet_id: SheetId) -> PathBuf {
    dir.as_ref().join(format!("sheet_{sheet_id}.json"))
}

/// Read a JSON document.
pub async fn read_document(path: impl AsRef<Path>) -> Result<serde_json::Value, PersistError> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Load and decode a rulebook document.
pub async fn load_rulebook(path: impl AsRef<Path>) -> Result<Rulebook, PersistError> {
    let document = read_document(path).await?;
    Ok(schema::decode::<Rulebook>(&document)?)
}

/// Load and decode a sheet document, playing under `rulebook`.
pub async fn load_sheet(path: impl AsRef<Path>, rulebook: Arc<Rulebook>) -> Result<Sheet, PersistError> {
    let document = read_document(path).await?;
    let variables = schema::decode_variables(&document)?;
    let store = VariableStore::from_variables(variables)?;
    Ok(Sheet::with_store(rulebook, store))
}

/// Get current timestamp as seconds since the Unix epoch.
fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}
