//! Presets command implementation.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use stratum_recipes::{ARCHITECTURES, TP_OVERLAP_PROFILES};

/// Execute the presets command.
pub fn execute(json_output: bool) -> Result<()> {
    if json_output {
        let architectures: Vec<_> = ARCHITECTURES
            .iter()
            .map(|preset| {
                json!({
                    "name": preset.name,
                    "family": preset.family,
                    "config_target": preset.config_target,
                    "num_layers": preset.config.num_layers,
                    "hidden_size": preset.config.hidden_size,
                    "num_attention_heads": preset.config.num_attention_heads,
                    "seq_length": preset.config.seq_length,
                })
            })
            .collect();
        let profiles: Vec<_> = TP_OVERLAP_PROFILES
            .iter()
            .map(|profile| json!({ "name": profile.name, "summary": profile.summary }))
            .collect();
        let listing = json!({
            "architectures": architectures,
            "tp_overlap_profiles": profiles,
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!();
    let title = format!("Model architectures ({})", ARCHITECTURES.len());
    println!("{}", title.bold().cyan());
    println!();
    println!(
        "{:<16} {:<10} {:>7} {:>8} {:>7} {:>8}",
        "Name", "Family", "Layers", "Hidden", "Heads", "SeqLen"
    );
    println!("{}", "-".repeat(62));
    for preset in ARCHITECTURES {
        let family = format!("{:?}", preset.family).to_lowercase();
        println!(
            "{:<16} {:<10} {:>7} {:>8} {:>7} {:>8}",
            preset.name.cyan(),
            family.dimmed(),
            preset.config.num_layers,
            preset.config.hidden_size,
            preset.config.num_attention_heads,
            preset.config.seq_length
        );
    }

    println!();
    let title = format!("TP overlap profiles ({})", TP_OVERLAP_PROFILES.len());
    println!("{}", title.bold().cyan());
    println!();
    for profile in TP_OVERLAP_PROFILES {
        println!("  {}", profile.name.cyan());
        println!("    {}", profile.summary.dimmed());
    }
    println!();
    Ok(())
}
