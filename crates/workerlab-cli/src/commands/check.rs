//! The `workerlab check` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};

use workerlab_core::model::{Exercise, Submission, Verdict};
use workerlab_core::parser::load_exercises;

use crate::config::load_config_from;

pub async fn execute(
    exercise_path: PathBuf,
    code_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let exercises = load_exercises(&exercise_path)?;
    anyhow::ensure!(
        !exercises.is_empty(),
        "no exercises found in {}",
        exercise_path.display()
    );

    let code = match &code_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read submission: {}", path.display()))?,
        ),
        None => None,
    };

    let coordinator = config.coordinator();
    let mut total = 0;
    let mut failed = 0;

    for exercise in &exercises {
        let submission = Submission::new(code.clone().unwrap_or_else(|| exercise.solution.clone()));
        let verdicts = coordinator
            .run_all(&submission, &exercise.tests)
            .await
            .with_context(|| format!("failed to grade exercise '{}'", exercise.id))?;

        print_verdicts(exercise, &verdicts);
        total += verdicts.len();
        failed += verdicts.iter().filter(|v| !v.passed).count();
    }

    println!("\n{}/{} tests passed", total - failed, total);
    anyhow::ensure!(failed == 0, "{failed} test(s) failed");
    Ok(())
}

fn print_verdicts(exercise: &Exercise, verdicts: &[Verdict]) {
    let mut table = Table::new();
    table.set_header(vec!["Test", "Result", "Status", "Time", "Reason"]);

    for verdict in verdicts {
        let result = if verdict.passed {
            Cell::new("PASS").fg(Color::Green)
        } else {
            Cell::new("FAIL").fg(Color::Red)
        };
        let status = verdict
            .result
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&verdict.test_name),
            result,
            Cell::new(status),
            Cell::new(format!("{}ms", verdict.result.duration_ms)),
            Cell::new(&verdict.reason),
        ]);
    }

    println!("\n{} ({})", exercise.title, exercise.id);
    println!("{table}");
}
