//! Show command implementation.
//!
//! Builds a recipe (or a bare model node), applies `--set` overrides and
//! renders the tree.

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use stratum_recipes::factory::parse_assignment;
use stratum_recipes::{
    OutputFormat, Override, StratumConfig, apply_overrides, build_model, parse_factory_call,
    pretrain_factory,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Toml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Self::Json,
            FormatArg::Toml => Self::Toml,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub factory: String,
    pub args: Vec<String>,
    pub overrides: Vec<String>,
    pub format: Option<FormatArg>,
    pub output: Option<PathBuf>,
}

/// Execute the show command.
pub fn execute(options: &ShowOptions, config: &StratumConfig) -> Result<()> {
    let format = match options.format {
        Some(arg) => OutputFormat::from(arg),
        None => config.output.format.unwrap_or_default(),
    };
    let overrides = options
        .overrides
        .iter()
        .map(|raw| raw.parse::<Override>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut call = parse_factory_call(&options.factory)?;

    let rendered = if let Some(preset) = call.name.strip_suffix(".model") {
        if !call.kwargs.is_empty() || !options.args.is_empty() {
            bail!("Model presets take no keyword arguments ({})", call.name);
        }
        let model = build_model(preset)?;
        render(&apply_overrides(&model, &overrides)?, format)?
    } else {
        let factory = pretrain_factory(&call.name)?;
        for raw in &options.args {
            let (key, value) = parse_assignment(raw)
                .map_err(|reason| anyhow::anyhow!("Invalid --arg `{raw}`: {reason}"))?;
            call.kwargs.insert(key, value);
        }
        if let Some(ref dir) = config.defaults.dir {
            if !call.kwargs.contains_key("dir") {
                call.kwargs.insert("dir".to_string(), Value::String(dir.display().to_string()));
            }
        }

        let recipe = factory
            .build(call.kwargs)
            .with_context(|| format!("Failed to build {}", factory.name))?;
        render(&apply_overrides(&recipe, &overrides)?, format)?
    };

    match options.output {
        Some(ref path) => write_output(path, &rendered)?,
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}

fn render<T: Serialize>(tree: &T, format: OutputFormat) -> Result<String> {
    format.render(tree).context("Failed to serialize configuration")
}

fn write_output(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote configuration");
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}
