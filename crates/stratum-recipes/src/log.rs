//! Experiment logging, checkpointing and resume policy nodes.

use crate::node::{Node, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_TENSORBOARD_DIR: &str = "tb_logs";
pub const DEFAULT_CHECKPOINT_FILENAME: &str =
    "{model_name}--{val_loss:.2f}-{step}-{consumed_samples}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorBoardLogger {
    pub save_dir: String,
    pub name: String,
}

impl Target for TensorBoardLogger {
    const TARGET: &'static str = "lightning.pytorch.loggers.TensorBoardLogger";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WandbLogger {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl Target for WandbLogger {
    const TARGET: &'static str = "lightning.pytorch.loggers.WandbLogger";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    pub save_last: bool,
    pub save_top_k: i32,
    pub every_n_train_steps: u32,
    pub filename: String,
}

impl Target for ModelCheckpoint {
    const TARGET: &'static str = "nemo.lightning.pytorch.callbacks.ModelCheckpoint";
}

impl Default for ModelCheckpoint {
    fn default() -> Self {
        Self {
            save_last: true,
            save_top_k: 10,
            every_n_train_steps: 200,
            filename: DEFAULT_CHECKPOINT_FILENAME.to_string(),
        }
    }
}

/// Where and how a run writes logs and checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogger {
    pub ckpt: Node<ModelCheckpoint>,
    pub name: String,
    pub tensorboard: Option<Node<TensorBoardLogger>>,
    pub wandb: Option<Node<WandbLogger>>,
    pub log_dir: Option<PathBuf>,
}

impl Target for RunLogger {
    const TARGET: &'static str = "nemo.lightning.NeMoLogger";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoResume {
    pub resume_if_exists: bool,
    pub resume_ignore_no_checkpoint: bool,
}

impl Target for AutoResume {
    const TARGET: &'static str = "nemo.lightning.AutoResume";
}

impl Default for AutoResume {
    fn default() -> Self {
        Self {
            resume_if_exists: true,
            resume_ignore_no_checkpoint: true,
        }
    }
}

pub fn tensorboard_logger(name: &str, save_dir: &str) -> Node<TensorBoardLogger> {
    Node::new(TensorBoardLogger {
        save_dir: save_dir.to_string(),
        name: name.to_string(),
    })
}

pub fn wandb_logger(project: &str, name: &str, entity: Option<&str>) -> Node<WandbLogger> {
    Node::new(WandbLogger {
        project: project.to_string(),
        name: name.to_string(),
        config: BTreeMap::new(),
        entity: entity.map(str::to_string),
    })
}

/// Logger with the default checkpoint policy: keep the last checkpoint plus
/// the ten best, saving every 200 steps.
pub fn default_log(
    dir: Option<&Path>,
    name: &str,
    tensorboard: Option<Node<TensorBoardLogger>>,
    wandb: Option<Node<WandbLogger>>,
) -> Node<RunLogger> {
    Node::new(RunLogger {
        ckpt: Node::default(),
        name: name.to_string(),
        tensorboard,
        wandb,
        log_dir: dir.map(Path::to_path_buf),
    })
}

/// Resume from the latest checkpoint when one exists, start fresh otherwise.
pub fn default_resume() -> Node<AutoResume> {
    Node::default()
}
