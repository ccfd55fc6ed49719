//! The `workerlab validate` command.

use std::path::PathBuf;

use anyhow::Result;

use workerlab_core::parser::{load_exercises, validate_exercise};

pub fn execute(exercise_path: PathBuf) -> Result<()> {
    let exercises = load_exercises(&exercise_path)?;
    anyhow::ensure!(
        !exercises.is_empty(),
        "no exercises found in {}",
        exercise_path.display()
    );

    let mut total_warnings = 0;

    for exercise in &exercises {
        println!(
            "Exercise: {} ({} tests)",
            exercise.title,
            exercise.tests.len()
        );

        let warnings = validate_exercise(exercise);
        for w in &warnings {
            let prefix = w
                .test_name
                .as_ref()
                .map(|name| format!("  [{name}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All exercises valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
