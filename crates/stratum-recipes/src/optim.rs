//! Optimizer and learning-rate schedule nodes.

use crate::node::{Node, Target};
use crate::precision::Precision;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
}

/// Megatron-core optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub optimizer: OptimizerKind,
    pub lr: f64,
    pub weight_decay: f64,
    pub bf16: bool,
    pub fp16: bool,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
    pub adam_eps: f64,
    pub use_distributed_optimizer: bool,
    pub clip_grad: f64,
}

impl Target for OptimizerConfig {
    const TARGET: &'static str = "megatron.core.optimizer.OptimizerConfig";
}

/// Linear warmup, optional constant plateau, then cosine decay to `min_lr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosineAnnealingScheduler {
    pub warmup_steps: u64,
    pub constant_steps: u64,
    pub min_lr: f64,
}

impl Target for CosineAnnealingScheduler {
    const TARGET: &'static str = "nemo.lightning.pytorch.optim.CosineAnnealingScheduler";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerModule {
    pub config: Node<OptimizerConfig>,
    pub lr_scheduler: Node<CosineAnnealingScheduler>,
}

impl Target for OptimizerModule {
    const TARGET: &'static str = "nemo.lightning.MegatronOptimizerModule";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineAdamArgs {
    pub precision: Precision,
    pub warmup_steps: u64,
    pub constant_steps: u64,
    pub max_lr: f64,
    /// Defaults to a tenth of `max_lr`.
    pub min_lr: Option<f64>,
    pub clip_grad: f64,
}

impl Default for CosineAdamArgs {
    fn default() -> Self {
        Self {
            precision: Precision::Bf16Mixed,
            warmup_steps: 2000,
            constant_steps: 0,
            max_lr: 1e-4,
            min_lr: None,
            clip_grad: 1.0,
        }
    }
}

/// Distributed fused Adam with a cosine-annealed learning rate.
pub fn distributed_fused_adam_with_cosine_annealing(
    args: CosineAdamArgs,
) -> Node<OptimizerModule> {
    let config = Node::new(OptimizerConfig {
        optimizer: OptimizerKind::Adam,
        lr: args.max_lr,
        weight_decay: 0.1,
        bf16: args.precision == Precision::Bf16Mixed,
        fp16: args.precision == Precision::Fp16Mixed,
        adam_beta1: 0.9,
        adam_beta2: 0.95,
        adam_eps: 1e-5,
        use_distributed_optimizer: true,
        clip_grad: args.clip_grad,
    });
    let lr_scheduler = Node::new(CosineAnnealingScheduler {
        warmup_steps: args.warmup_steps,
        constant_steps: args.constant_steps,
        min_lr: args.min_lr.unwrap_or(0.1 * args.max_lr),
    });
    Node::new(OptimizerModule {
        config,
        lr_scheduler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_lr_defaults_to_tenth_of_max() {
        let optim = distributed_fused_adam_with_cosine_annealing(CosineAdamArgs {
            max_lr: 0.9e-4,
            ..Default::default()
        });
        assert!((optim.lr_scheduler.min_lr - 0.9e-5).abs() < 1e-12);
        assert!((optim.config.lr - 0.9e-4).abs() < f64::EPSILON);
        assert_eq!(optim.lr_scheduler.warmup_steps, 2000);
    }

    #[test]
    fn test_optimizer_kind_serializes_lowercase() {
        let optim = distributed_fused_adam_with_cosine_annealing(CosineAdamArgs::default());
        assert_eq!(optim.config.optimizer, OptimizerKind::Adam);
        let json = serde_json::to_value(&optim).unwrap();
        assert_eq!(json["config"]["optimizer"], "adam");
    }

    #[test]
    fn test_precision_flags_follow_mode() {
        let bf16 = distributed_fused_adam_with_cosine_annealing(CosineAdamArgs::default());
        assert!(bf16.config.bf16);
        assert!(!bf16.config.fp16);

        let fp16 = distributed_fused_adam_with_cosine_annealing(CosineAdamArgs {
            precision: Precision::Fp16Mixed,
            ..Default::default()
        });
        assert!(fp16.config.fp16);
        assert!(!fp16.config.bf16);

        let fp32 = distributed_fused_adam_with_cosine_annealing(CosineAdamArgs {
            precision: Precision::Fp32,
            min_lr: Some(3e-6),
            ..Default::default()
        });
        assert!(!fp32.config.fp16 && !fp32.config.bf16);
        assert!((fp32.lr_scheduler.min_lr - 3e-6).abs() < f64::EPSILON);
    }
}
