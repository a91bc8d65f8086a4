//! The `answerscore check` command.

use std::path::PathBuf;

use anyhow::Result;

use answerscore_core::precheck;

pub async fn execute(student: PathBuf, reference: PathBuf) -> Result<()> {
    let warnings = precheck(&student, &reference).await?;

    if warnings.is_empty() {
        println!("Pre-checks passed: documents look consistent");
    } else {
        println!("{} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}
