//! Stratum Recipes
//!
//! Typed configuration trees for large language model pretraining runs:
//! - Tagged config nodes (`Node<T>`) that serialize with a `_target_` key
//! - Model architecture presets (GPT3, Nemotron3, Nemotron4)
//! - Trainer, parallelism strategy, precision and comm-overlap building blocks
//! - Pretraining recipes with base and performance-tuned variants
//! - Named factories, dotted overrides, and user config files

pub mod config;
pub mod data;
pub mod error;
pub mod factory;
pub mod log;
pub mod model;
pub mod node;
pub mod optim;
pub mod overlap;
pub mod overrides;
pub mod precision;
pub mod recipe;
pub mod recipes;
pub mod registry;
pub mod strategy;
pub mod trainer;

pub use config::{OutputConfig, OutputFormat, RecipeDefaults, StratumConfig};
pub use data::{MockDataModule, mock_data};
pub use error::{RecipeError, RecipeResult};
pub use factory::{FactoryCall, Kwargs, parse_factory_call};
pub use log::{
    AutoResume, ModelCheckpoint, RunLogger, TensorBoardLogger, WandbLogger, default_log,
    default_resume,
};
pub use model::{
    ARCHITECTURES, ArchitectureConfig, ArchitecturePreset, LanguageModel, ModelFamily, architecture,
};
pub use node::{Node, Target};
pub use optim::{CosineAdamArgs, OptimizerModule, distributed_fused_adam_with_cosine_annealing};
pub use overlap::{
    TP_OVERLAP_PROFILES, TpOverlapProfile, TransformerLayerTpOverlap, tp_overlap_profile,
};
pub use overrides::{Override, apply_overrides};
pub use precision::{MixedPrecision, Precision};
pub use recipe::{EntryPoint, PretrainRecipe, RunArgs};
pub use registry::{
    PRETRAIN_FACTORIES, PretrainFactory, build_model, build_pretrain, pretrain_factory,
};
pub use strategy::{DdpConfig, DistributedDataParallelConfig, MegatronStrategy, ParallelLayout};
pub use trainer::{Callback, CommOverlapCallback, Trainer};
