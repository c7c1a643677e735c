//! Nemotron4 22B pretraining.

use super::nemotron::{NemotronTrainerArgs, nemotron_trainer};
use crate::data::mock_data;
use crate::log::{DEFAULT_TENSORBOARD_DIR, default_log, default_resume, tensorboard_logger};
use crate::model::{LanguageModel, NEMOTRON4_22B};
use crate::node::Node;
use crate::optim::{CosineAdamArgs, distributed_fused_adam_with_cosine_annealing};
use crate::precision::{DType, Precision};
use crate::recipe::{EntryPoint, PretrainRecipe};
use crate::trainer::{Callback, CommOverlapCallback, Trainer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const NAME: &str = "nemotron4_22b";

pub fn model() -> Node<LanguageModel> {
    NEMOTRON4_22B.model()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PretrainArgs {
    pub dir: Option<PathBuf>,
    pub name: String,

    pub tensor_parallelism: u32,
    pub pipeline_parallelism: u32,
    pub pipeline_parallelism_type: Option<DType>,
    pub virtual_pipeline_parallelism: Option<u32>,
    pub context_parallelism: u32,
    pub sequence_parallelism: bool,
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
    pub max_steps: u64,
    pub precision: Precision,
    pub accumulate_grad_batches: u32,
    pub gradient_clip_val: f64,
    pub limit_test_batches: u32,
    pub limit_val_batches: u32,
    pub log_every_n_steps: u32,
    pub val_check_interval: u32,

    pub global_batch_size: u32,
    pub micro_batch_size: u32,
    pub seq_length: u32,

    pub warmup_steps: u64,
    pub constant_steps: u64,
    pub min_lr: f64,
    pub max_lr: f64,

    #[serde(rename = "fn")]
    pub entry_point: EntryPoint,
}

impl Default for PretrainArgs {
    fn default() -> Self {
        Self {
            dir: None,
            name: "default".to_string(),
            tensor_parallelism: 2,
            pipeline_parallelism: 4,
            pipeline_parallelism_type: None,
            virtual_pipeline_parallelism: Some(10),
            context_parallelism: 1,
            sequence_parallelism: false,
            num_nodes: 1,
            num_gpus_per_node: 8,
            max_steps: 300_000,
            precision: Precision::Bf16Mixed,
            accumulate_grad_batches: 1,
            gradient_clip_val: 1.0,
            limit_test_batches: 32,
            limit_val_batches: 32,
            log_every_n_steps: 10,
            val_check_interval: 2000,
            global_batch_size: 32,
            micro_batch_size: 1,
            seq_length: 4096,
            warmup_steps: 500,
            constant_steps: 0,
            min_lr: 1e-5,
            max_lr: 1e-4,
            entry_point: EntryPoint::default(),
        }
    }
}

pub fn pretrain_recipe(args: PretrainArgs) -> PretrainRecipe {
    debug!(
        recipe = NAME,
        name = %args.name,
        num_nodes = args.num_nodes,
        num_gpus_per_node = args.num_gpus_per_node,
        precision = %args.precision,
        "Building pretrain recipe"
    );

    PretrainRecipe {
        model: model(),
        trainer: nemotron_trainer(NemotronTrainerArgs {
            tensor_parallelism: args.tensor_parallelism,
            pipeline_parallelism: args.pipeline_parallelism,
            pipeline_parallelism_type: args.pipeline_parallelism_type,
            virtual_pipeline_parallelism: args.virtual_pipeline_parallelism,
            context_parallelism: args.context_parallelism,
            sequence_parallelism: args.sequence_parallelism,
            num_nodes: args.num_nodes,
            num_gpus_per_node: args.num_gpus_per_node,
            max_steps: args.max_steps,
            precision: args.precision,
            accumulate_grad_batches: args.accumulate_grad_batches,
            limit_test_batches: args.limit_test_batches,
            limit_val_batches: args.limit_val_batches,
            log_every_n_steps: args.log_every_n_steps,
            val_check_interval: args.val_check_interval,
            callbacks: vec![Callback::timing()],
        }),
        data: mock_data(
            args.seq_length,
            args.global_batch_size,
            args.micro_batch_size,
        ),
        log: default_log(
            args.dir.as_deref(),
            &args.name,
            Some(tensorboard_logger(&args.name, DEFAULT_TENSORBOARD_DIR)),
            None,
        ),
        optim: distributed_fused_adam_with_cosine_annealing(CosineAdamArgs {
            precision: args.precision,
            warmup_steps: args.warmup_steps,
            constant_steps: args.constant_steps,
            max_lr: args.max_lr,
            min_lr: Some(args.min_lr),
            clip_grad: args.gradient_clip_val,
        }),
        resume: default_resume(),
        entry_point: args.entry_point,
    }
}

/// Arguments of the optimized recipe. Everything else keeps the base defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizedArgs {
    pub dir: Option<PathBuf>,
    pub name: String,
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
    #[serde(rename = "fn")]
    pub entry_point: EntryPoint,
}

impl Default for OptimizedArgs {
    fn default() -> Self {
        Self {
            dir: None,
            name: "default".to_string(),
            num_nodes: 8,
            num_gpus_per_node: 8,
            entry_point: EntryPoint::default(),
        }
    }
}

pub fn comm_overlap_callback() -> CommOverlapCallback {
    CommOverlapCallback {
        tp_comm_overlap: Some(true),
        defer_embedding_wgrad_compute: Some(true),
        wgrad_deferral_limit: Some(22),
        ..Default::default()
    }
}

/// Base recipe with gradient reduction kept in bf16 and TP communication
/// overlap enabled.
pub fn pretrain_recipe_performance(args: OptimizedArgs) -> PretrainRecipe {
    let mut recipe = pretrain_recipe(PretrainArgs {
        dir: args.dir,
        name: args.name,
        num_nodes: args.num_nodes,
        num_gpus_per_node: args.num_gpus_per_node,
        entry_point: args.entry_point,
        ..Default::default()
    });

    disable_fp32_grad_reduce(&mut recipe.trainer);
    recipe.trainer.callbacks.push(comm_overlap_callback().into());
    debug!(
        recipe = NAME,
        callbacks = recipe.trainer.callbacks.len(),
        "Applied performance overrides"
    );
    recipe
}

/// Turn off fp32 gradient reduction on the precision plugin and the DDP
/// config. Either half is skipped, with a warning, when the trainer does not
/// carry that piece in the expected shape.
pub(crate) fn disable_fp32_grad_reduce(trainer: &mut Trainer) {
    match trainer.plugins.as_mut() {
        Some(plugin) => plugin.grad_reduce_in_fp32 = false,
        None => warn!(
            recipe = NAME,
            "Trainer has no mixed-precision plugin; grad_reduce_in_fp32 left unchanged"
        ),
    }

    match trainer.strategy.ddp_config_mut() {
        Some(ddp) => ddp.grad_reduce_in_fp32 = false,
        None => warn!(
            recipe = NAME,
            ddp = ?trainer.strategy.ddp,
            "Strategy ddp is not an explicit config; grad_reduce_in_fp32 left unchanged"
        ),
    }
}
