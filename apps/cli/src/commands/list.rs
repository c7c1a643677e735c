//! List command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use stratum_recipes::PRETRAIN_FACTORIES;

/// Execute the list command.
pub fn execute(json_output: bool) -> Result<()> {
    if json_output {
        let mut entries = Vec::with_capacity(PRETRAIN_FACTORIES.len());
        for factory in PRETRAIN_FACTORIES {
            let defaults = factory
                .defaults()
                .with_context(|| format!("Failed to read defaults of {}", factory.name))?;
            entries.push(json!({
                "name": factory.name,
                "aliases": factory.aliases,
                "summary": factory.summary,
                "defaults": defaults,
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!();
    let title = format!("Recipe factories ({})", PRETRAIN_FACTORIES.len());
    println!("{}", title.bold().cyan());
    println!();
    println!("{:<26} {:<44} {}", "Name", "Alias", "Summary");
    println!("{}", "-".repeat(110));

    for factory in PRETRAIN_FACTORIES {
        println!(
            "{:<26} {:<44} {}",
            factory.name.cyan(),
            factory.aliases.join(", ").dimmed(),
            factory.summary
        );
    }

    println!();
    println!(
        "  {}",
        "Build one with: stratum show <name>(key=value, ...)".dimmed()
    );
    println!();
    Ok(())
}
