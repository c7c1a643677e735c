//! Megatron distributed strategy and data-parallel settings.

use crate::node::{Node, Target};
use crate::precision::DType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Megatron-core data-parallel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributedDataParallelConfig {
    pub check_for_nan_in_grad: bool,
    pub grad_reduce_in_fp32: bool,
    pub overlap_grad_reduce: bool,
    pub overlap_param_gather: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_in_collective: Option<bool>,
}

impl Target for DistributedDataParallelConfig {
    const TARGET: &'static str = "megatron.core.distributed.DistributedDataParallelConfig";
}

impl Default for DistributedDataParallelConfig {
    fn default() -> Self {
        Self {
            check_for_nan_in_grad: true,
            grad_reduce_in_fp32: true,
            overlap_grad_reduce: true,
            overlap_param_gather: true,
            average_in_collective: None,
        }
    }
}

/// Data-parallel wrapper selected by name, leaving its settings to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DdpBackend {
    Megatron,
    Pytorch,
}

impl fmt::Display for DdpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Megatron => f.write_str("megatron"),
            Self::Pytorch => f.write_str("pytorch"),
        }
    }
}

/// The strategy's `ddp` field: a backend name or an explicit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DdpConfig {
    Backend(DdpBackend),
    Megatron(Node<DistributedDataParallelConfig>),
}

impl From<DistributedDataParallelConfig> for DdpConfig {
    fn from(config: DistributedDataParallelConfig) -> Self {
        Self::Megatron(Node::new(config))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MegatronStrategy {
    pub tensor_model_parallel_size: u32,
    pub pipeline_model_parallel_size: u32,
    pub pipeline_dtype: Option<DType>,
    pub virtual_pipeline_model_parallel_size: Option<u32>,
    pub context_parallel_size: u32,
    pub sequence_parallel: bool,
    pub gradient_as_bucket_view: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ckpt_include_optimizer: Option<bool>,
    pub ckpt_async_save: bool,
    pub ckpt_parallel_load: bool,
    pub ddp: DdpConfig,
}

impl Target for MegatronStrategy {
    const TARGET: &'static str = "nemo.lightning.MegatronStrategy";
}

impl MegatronStrategy {
    /// Strategy with the given parallel layout and the checkpoint I/O settings
    /// every pretraining recipe shares.
    #[must_use]
    pub fn new(layout: ParallelLayout, ddp: impl Into<DdpConfig>) -> Self {
        Self {
            tensor_model_parallel_size: layout.tensor,
            pipeline_model_parallel_size: layout.pipeline,
            pipeline_dtype: layout.pipeline_dtype,
            virtual_pipeline_model_parallel_size: layout.virtual_pipeline,
            context_parallel_size: layout.context,
            sequence_parallel: layout.sequence,
            gradient_as_bucket_view: true,
            ckpt_include_optimizer: None,
            ckpt_async_save: true,
            ckpt_parallel_load: true,
            ddp: ddp.into(),
        }
    }

    /// Explicit data-parallel settings, if the strategy carries them.
    pub fn ddp_config_mut(&mut self) -> Option<&mut DistributedDataParallelConfig> {
        match &mut self.ddp {
            DdpConfig::Megatron(config) => Some(&mut **config),
            DdpConfig::Backend(_) => None,
        }
    }
}

/// Parallelism degrees for one run. Consistency with the device count is
/// checked by the runtime, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelLayout {
    pub tensor: u32,
    pub pipeline: u32,
    pub pipeline_dtype: Option<DType>,
    pub virtual_pipeline: Option<u32>,
    pub context: u32,
    pub sequence: bool,
}
