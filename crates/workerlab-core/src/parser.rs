//! TOML exercise parser.
//!
//! Loads exercises (starter code, reference solution, and test cases) from
//! TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Exercise, TestCase};

/// Intermediate TOML structure for parsing exercise files.
#[derive(Debug, Deserialize)]
struct TomlExerciseFile {
    exercise: TomlExerciseHeader,
    #[serde(default)]
    tests: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TomlExerciseHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    initial: String,
    solution: String,
}

/// Parse a single TOML file into an [`Exercise`].
pub fn parse_exercise(path: &Path) -> Result<Exercise> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exercise file: {}", path.display()))?;

    parse_exercise_str(&content, path)
}

/// Parse a TOML string into an [`Exercise`] (useful for testing).
pub fn parse_exercise_str(content: &str, source_path: &Path) -> Result<Exercise> {
    let parsed: TomlExerciseFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(Exercise {
        id: parsed.exercise.id,
        title: parsed.exercise.title,
        description: parsed.exercise.description,
        initial: parsed.exercise.initial,
        solution: parsed.exercise.solution,
        tests: parsed.tests,
    })
}

/// Recursively load all `.toml` exercise files from a directory.
///
/// Files that fail to parse are skipped with a warning. Results are sorted
/// by exercise id.
pub fn load_exercise_directory(dir: &Path) -> Result<Vec<Exercise>> {
    let mut exercises = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exercises.extend(load_exercise_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exercise(&path) {
                Ok(exercise) => exercises.push(exercise),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    exercises.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(exercises)
}

/// Load one file, or every exercise under a directory.
pub fn load_exercises(path: &Path) -> Result<Vec<Exercise>> {
    if path.is_dir() {
        load_exercise_directory(path)
    } else {
        Ok(vec![parse_exercise(path)?])
    }
}

/// A warning from exercise validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The test name (if applicable).
    pub test_name: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an exercise for common authoring mistakes.
pub fn validate_exercise(exercise: &Exercise) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exercise.solution.trim().is_empty() {
        warnings.push(ValidationWarning {
            test_name: None,
            message: "solution is empty".into(),
        });
    }

    if exercise.tests.is_empty() {
        warnings.push(ValidationWarning {
            test_name: None,
            message: "exercise has no tests".into(),
        });
    }

    let mut seen = HashSet::new();
    for test in &exercise.tests {
        if !seen.insert(&test.name) {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: format!("duplicate test name: {}", test.name),
            });
        }
    }

    // A test with no criteria passes vacuously.
    for test in &exercise.tests {
        if test.expectation.is_empty() {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: "test has no expectations and will always pass".into(),
            });
        }
    }

    for test in &exercise.tests {
        if !test.request.path.starts_with('/') {
            warnings.push(ValidationWarning {
                test_name: Some(test.name.clone()),
                message: format!(
                    "request path {:?} does not start with '/'",
                    test.request.path
                ),
            });
        }
    }

    warnings
}
