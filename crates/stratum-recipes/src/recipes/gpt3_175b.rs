//! GPT3 175B pretraining.

use crate::data::mock_data;
use crate::log::{DEFAULT_TENSORBOARD_DIR, default_log, default_resume, tensorboard_logger};
use crate::model::{GPT3_175B, LanguageModel};
use crate::node::Node;
use crate::optim::{CosineAdamArgs, distributed_fused_adam_with_cosine_annealing};
use crate::overlap::userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048;
use crate::precision::{DType, bf16_with_fp8_mixed};
use crate::recipe::{PretrainRecipe, RunArgs};
use crate::strategy::{DistributedDataParallelConfig, MegatronStrategy, ParallelLayout};
use crate::trainer::{Accelerator, Callback, CommOverlapCallback, Trainer};
use tracing::debug;

pub const NAME: &str = "gpt3_175b";

pub fn model() -> Node<LanguageModel> {
    GPT3_175B.model()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerArgs {
    pub tensor_parallelism: u32,
    pub pipeline_parallelism: u32,
    pub pipeline_parallelism_type: Option<DType>,
    pub virtual_pipeline_parallelism: Option<u32>,
    pub context_parallelism: u32,
    pub sequence_parallelism: bool,
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
    pub max_steps: u64,
    pub callbacks: Vec<Callback>,
}

impl Default for TrainerArgs {
    fn default() -> Self {
        Self {
            tensor_parallelism: 4,
            pipeline_parallelism: 8,
            pipeline_parallelism_type: Some(DType::Bfloat16),
            virtual_pipeline_parallelism: Some(6),
            context_parallelism: 1,
            sequence_parallelism: true,
            num_nodes: 64,
            num_gpus_per_node: 8,
            max_steps: 1_168_251,
            callbacks: Vec::new(),
        }
    }
}

/// Trainer with the parallel layout the 175B model needs: TP4 x PP8 with six
/// virtual pipeline stages and fp8 compute.
pub fn trainer(args: TrainerArgs) -> Node<Trainer> {
    let layout = ParallelLayout {
        tensor: args.tensor_parallelism,
        pipeline: args.pipeline_parallelism,
        pipeline_dtype: args.pipeline_parallelism_type,
        virtual_pipeline: args.virtual_pipeline_parallelism,
        context: args.context_parallelism,
        sequence: args.sequence_parallelism,
    };
    let ddp = DistributedDataParallelConfig {
        average_in_collective: Some(true),
        ..Default::default()
    };

    Node::new(Trainer {
        accelerator: Accelerator::Gpu,
        accumulate_grad_batches: 1,
        callbacks: args.callbacks,
        devices: args.num_gpus_per_node,
        limit_test_batches: 50,
        limit_val_batches: 32,
        log_every_n_steps: 10,
        max_steps: args.max_steps,
        num_nodes: args.num_nodes,
        plugins: Some(bf16_with_fp8_mixed()),
        strategy: Node::new(MegatronStrategy::new(layout, ddp)),
        use_distributed_sampler: false,
        val_check_interval: 2000,
    })
}

pub fn pretrain_recipe(args: RunArgs) -> PretrainRecipe {
    debug!(
        recipe = NAME,
        name = %args.name,
        num_nodes = args.num_nodes,
        num_gpus_per_node = args.num_gpus_per_node,
        "Building pretrain recipe"
    );

    PretrainRecipe {
        model: model(),
        trainer: trainer(TrainerArgs {
            num_nodes: args.num_nodes,
            num_gpus_per_node: args.num_gpus_per_node,
            callbacks: vec![Callback::timing()],
            ..Default::default()
        }),
        data: mock_data(2048, 2048, 2),
        log: default_log(
            args.dir.as_deref(),
            &args.name,
            Some(tensorboard_logger(&args.name, DEFAULT_TENSORBOARD_DIR)),
            None,
        ),
        optim: distributed_fused_adam_with_cosine_annealing(CosineAdamArgs {
            max_lr: 0.9e-4,
            ..Default::default()
        }),
        resume: default_resume(),
        entry_point: args.entry_point,
    }
}

/// Overlap settings for H100 with fp8 userbuffers.
pub fn comm_overlap_callback() -> CommOverlapCallback {
    CommOverlapCallback {
        tp_comm_overlap: Some(true),
        tp_comm_overlap_cfg: Some(userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048()),
        defer_embedding_wgrad_compute: Some(true),
        wgrad_deferral_limit: Some(50),
        overlap_param_gather_with_optimizer_step: Some(true),
        align_param_gather: Some(true),
        ..Default::default()
    }
}

/// Base recipe plus communication overlap.
pub fn pretrain_recipe_performance(args: RunArgs) -> PretrainRecipe {
    let mut recipe = pretrain_recipe(args);
    recipe.trainer.callbacks.push(comm_overlap_callback().into());
    debug!(
        recipe = NAME,
        callbacks = recipe.trainer.callbacks.len(),
        "Applied performance overrides"
    );
    recipe
}
