//! Building blocks shared by the Nemotron recipes.

use crate::error::{RecipeError, RecipeResult};
use crate::model::{LanguageModel, ModelFamily, architecture};
use crate::node::Node;
use crate::precision::{DType, Precision, plugin_for};
use crate::strategy::{DistributedDataParallelConfig, MegatronStrategy, ParallelLayout};
use crate::trainer::{Accelerator, Callback, Trainer};

/// Model node for a Nemotron version such as `nemotron4_22b`.
pub fn nemotron_model(version: &str) -> RecipeResult<Node<LanguageModel>> {
    let preset = architecture(version)?;
    if preset.family != ModelFamily::Nemotron {
        return Err(RecipeError::UnknownPreset(format!("{version} is not a Nemotron model")));
    }
    Ok(preset.model())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NemotronTrainerArgs {
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
    pub limit_test_batches: u32,
    pub limit_val_batches: u32,
    pub log_every_n_steps: u32,
    pub val_check_interval: u32,
    pub callbacks: Vec<Callback>,
}

impl Default for NemotronTrainerArgs {
    fn default() -> Self {
        Self {
            tensor_parallelism: 2,
            pipeline_parallelism: 1,
            pipeline_parallelism_type: None,
            virtual_pipeline_parallelism: None,
            context_parallelism: 1,
            sequence_parallelism: false,
            num_nodes: 1,
            num_gpus_per_node: 8,
            max_steps: 10,
            precision: Precision::Bf16Mixed,
            accumulate_grad_batches: 1,
            limit_test_batches: 32,
            limit_val_batches: 32,
            log_every_n_steps: 10,
            val_check_interval: 2000,
            callbacks: Vec::new(),
        }
    }
}

pub fn nemotron_trainer(args: NemotronTrainerArgs) -> Node<Trainer> {
    let layout = ParallelLayout {
        tensor: args.tensor_parallelism,
        pipeline: args.pipeline_parallelism,
        pipeline_dtype: args.pipeline_parallelism_type,
        virtual_pipeline: args.virtual_pipeline_parallelism,
        context: args.context_parallelism,
        sequence: args.sequence_parallelism,
    };
    let mut strategy = MegatronStrategy::new(layout, DistributedDataParallelConfig::default());
    strategy.ckpt_include_optimizer = Some(true);

    Node::new(Trainer {
        accelerator: Accelerator::Gpu,
        accumulate_grad_batches: args.accumulate_grad_batches,
        callbacks: args.callbacks,
        devices: args.num_gpus_per_node,
        limit_test_batches: args.limit_test_batches,
        limit_val_batches: args.limit_val_batches,
        log_every_n_steps: args.log_every_n_steps,
        max_steps: args.max_steps,
        num_nodes: args.num_nodes,
        plugins: plugin_for(args.precision),
        strategy: Node::new(strategy),
        use_distributed_sampler: false,
        val_check_interval: args.val_check_interval,
    })
}
