//! The `workerlab init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("workerlab.toml").exists() {
        println!("workerlab.toml already exists, skipping.");
    } else {
        std::fs::write("workerlab.toml", SAMPLE_CONFIG)?;
        println!("Created workerlab.toml");
    }

    std::fs::create_dir_all("exercises")?;
    let example_path = Path::new("exercises/hello-world.toml");
    if example_path.exists() {
        println!("exercises/hello-world.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXERCISE)?;
        println!("Created exercises/hello-world.toml");
    }

    println!("\nNext steps:");
    println!("  1. Install Deno (https://deno.com) or set sandbox.deno_path");
    println!("  2. Run: workerlab validate --exercise exercises/hello-world.toml");
    println!("  3. Run: workerlab check --exercise exercises/hello-world.toml");
    println!("  4. Run: workerlab serve");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# workerlab configuration

listen = "127.0.0.1:1337"
time_budget_ms = 5000
parallelism = 4
compatibility_date = "2025-01-01"
max_source_bytes = 262144

[sandbox]
deno_path = "deno"
max_heap_mb = 128
max_body_bytes = 1048576
"#;

const EXAMPLE_EXERCISE: &str = r#"[exercise]
id = "hello-world"
title = "Your First Worker"
description = "Return \"Hello World!\" from the fetch handler"
initial = """
export default {
  async fetch(request) {
    return new Response("Change me!");
  }
}
"""
solution = """
export default {
  async fetch(request) {
    return new Response("Hello World!");
  }
}
"""

[[tests]]
name = "Returns Hello World"
request = { path = "/" }
expect = { status = 200, bodyEquals = "Hello World!" }
"#;
