//! The top-level pretraining recipe.

use crate::data::MockDataModule;
use crate::log::{AutoResume, RunLogger};
use crate::model::LanguageModel;
use crate::node::Node;
use crate::optim::OptimizerModule;
use crate::trainer::Trainer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The runtime function a recipe is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryPoint(pub String);

impl EntryPoint {
    pub const PRETRAIN: &'static str = "nemo.collections.llm.api.pretrain";
}

impl Default for EntryPoint {
    fn default() -> Self {
        Self(Self::PRETRAIN.to_string())
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A partially applied call of `entry_point` with every branch of a run's
/// configuration bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PretrainRecipe {
    #[serde(rename = "_target_")]
    pub entry_point: EntryPoint,
    pub model: Node<LanguageModel>,
    pub trainer: Node<Trainer>,
    pub data: Node<MockDataModule>,
    pub log: Node<RunLogger>,
    pub optim: Node<OptimizerModule>,
    pub resume: Node<AutoResume>,
}

/// Run identity and scale shared by every pretraining factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunArgs {
    /// Directory for logs and checkpoints.
    pub dir: Option<PathBuf>,
    pub name: String,
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
    #[serde(rename = "fn")]
    pub entry_point: EntryPoint,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            dir: None,
            name: "default".to_string(),
            num_nodes: 1,
            num_gpus_per_node: 8,
            entry_point: EntryPoint::default(),
        }
    }
}
