//! The `answerscore history` command.

use std::path::PathBuf;

use anyhow::Result;

use answerscore_core::store::{GradeStore, JsonFileStore};
use answerscore_providers::load_config_from;

pub async fn execute(student_id: String, format: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = JsonFileStore::new(&config.store.path);
    let history = store.history(&student_id).await?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        _ => {
            if history.is_empty() {
                println!("No grades recorded for {student_id}");
                return Ok(());
            }

            use comfy_table::{Cell, Table};

            let mut table = Table::new();
            table.set_header(vec!["Assignment", "Grade /20"]);
            for (key, grade) in &history {
                table.add_row(vec![Cell::new(key), Cell::new(format!("{grade:.2}"))]);
            }
            println!("Grades for {student_id}:\n{table}");
        }
    }
    Ok(())
}
