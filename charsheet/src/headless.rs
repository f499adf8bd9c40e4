//! Headless commands.
//!
//! Each command prints plain text to stdout and returns whether everything
//! it looked at was in order. Errors that stop a command outright (missing
//! files, malformed documents) are returned instead.

use charsheet_core::persist::{self, PersistError, SavedSheet};
use charsheet_core::{DiceRoll, EngineConfig, FunctionId, ProgramId, Rulebook, Sheet, VariableId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct EvalOptions {
    pub rulebook: PathBuf,
    pub sheet: PathBuf,
    pub seed: Option<u64>,
    pub variable: Option<String>,
    pub mechanics: bool,
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Parse `name` or `namespace::name`.
fn parse_variable_id(text: &str) -> VariableId {
    match text.split_once("::") {
        Some((namespace, name)) => VariableId::qualified(namespace, name),
        None => VariableId::new(text),
    }
}

async fn load(rulebook: &Path, sheet: &Path) -> Result<Sheet, PersistError> {
    let rulebook = Arc::new(persist::load_rulebook(rulebook).await?);
    info!(rulebook = %rulebook.name, "Loaded rulebook");
    let sheet = persist::load_sheet(sheet, rulebook).await?;
    Ok(sheet.with_config(EngineConfig::from_env()))
}

pub async fn run_eval(options: EvalOptions) -> Result<bool, PersistError> {
    let mut sheet = load(&options.rulebook, &options.sheet).await?;
    let mut dice = rng(options.seed);

    if options.mechanics {
        for id in sheet.activate_mechanics(&mut dice) {
            println!("[MECHANIC] {id}");
        }
    }

    if let Some(name) = options.variable {
        let id = parse_variable_id(&name);
        return Ok(match sheet.value(&id, &mut dice) {
            Ok(value) => {
                println!("{id} = {value}");
                true
            }
            Err(e) => {
                println!("[ERROR] {id}: {e}");
                false
            }
        });
    }

    let report = sheet.evaluate_all(&mut dice);
    for (id, result) in report.iter() {
        match result {
            Ok(value) => println!("{id} = {value}"),
            Err(e) => println!("[ERROR] {id}: {e}"),
        }
    }
    let failures = report.failures().count();
    println!();
    println!("{} evaluated, {} failed", report.len(), failures);
    Ok(failures == 0)
}

pub fn run_roll(notation: &str, seed: Option<u64>) -> Result<bool, Box<dyn std::error::Error>> {
    let roll = DiceRoll::parse(notation)?;
    let outcome = roll.roll_detailed(&mut rng(seed))?;
    println!("{roll}: {} = {}", outcome.dice_display(), outcome.total);
    Ok(true)
}

pub async fn run_conformance(rulebook: &Path, program: &str, function: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let rulebook = Arc::new(persist::load_rulebook(rulebook).await?);
    let sheet = Sheet::new(rulebook).with_config(EngineConfig::from_env());
    // Tabulated rows never roll; the seed only satisfies the evaluator.
    let mut dice = rng(Some(0));
    let report = sheet
        .evaluator(&mut dice)
        .check_conformance(&ProgramId::new(program), &FunctionId::new(function))?;

    for failure in &report.failures {
        let arguments: Vec<String> = failure.arguments.iter().map(ToString::to_string).collect();
        let actual = match &failure.actual {
            Ok(value) => value.to_string(),
            Err(e) => format!("error: {e}"),
        };
        println!(
            "[FAIL] row {}: ({}) expected {}, got {}",
            failure.row,
            arguments.join(", "),
            failure.expected,
            actual
        );
    }
    println!(
        "{} against {}: {}/{} rows passed",
        report.program_id,
        report.function_id,
        report.passed,
        report.total()
    );
    Ok(report.is_success())
}

/// Static checks that need no evaluation.
fn check_rulebook(rulebook: &Rulebook) -> usize {
    let mut problems = 0;
    let mut programs: Vec<_> = rulebook.programs().collect();
    programs.sort_by(|a, b| a.id.cmp(&b.id));
    for program in programs {
        for (statement, binding) in program.forward_references() {
            println!(
                "[WARN] program {}: statement {} reads '{}' before it is bound",
                program.id, statement, binding
            );
            problems += 1;
        }
    }
    problems
}

pub async fn run_check(rulebook: &Path, sheet: Option<&Path>) -> Result<bool, PersistError> {
    let rulebook = Arc::new(persist::load_rulebook(rulebook).await?);
    let mut problems = check_rulebook(&rulebook);

    if let Some(sheet) = sheet {
        let sheet = persist::load_sheet(sheet, Arc::clone(&rulebook)).await?;
        let mut reported = BTreeSet::new();
        for id in sheet.store().ids() {
            if reported.contains(id) {
                continue;
            }
            if let Some(cycle) = sheet.store().find_cycle(id, &rulebook) {
                let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                println!("[WARN] cycle: {}", path.join(" -> "));
                reported.extend(cycle);
                problems += 1;
            }
        }
    }

    if problems == 0 {
        println!("No problems found");
    }
    Ok(problems == 0)
}

pub async fn run_save(rulebook: &Path, sheet: &Path, dir: &Path) -> Result<bool, PersistError> {
    let sheet = load(rulebook, sheet).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = persist::sheet_save_path(dir, sheet.id);
    SavedSheet::new(&sheet).save_json(&path).await?;
    println!("[SAVED] {}", path.display());
    Ok(true)
}
