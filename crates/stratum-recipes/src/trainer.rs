//! Trainer and callback nodes.

use crate::node::{Node, Target};
use crate::overlap::TransformerLayerTpOverlap;
use crate::precision::MixedPrecision;
use crate::strategy::MegatronStrategy;
use serde::{Deserialize, Serialize};

/// Records per-step timings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingCallback {}

impl Target for TimingCallback {
    const TARGET: &'static str = "nemo.utils.exp_manager.TimingCallback";
}

/// Enables Megatron communication-overlap optimizations at setup time.
///
/// Unset fields leave the runtime's own choice in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommOverlapCallback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_comm_overlap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_comm_overlap_cfg: Option<Node<TransformerLayerTpOverlap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_p2p_comm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_p2p_comm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_grad_reduce: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_param_gather: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_param_gather_with_optimizer_step: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_param_gather: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_embedding_wgrad_compute: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wgrad_deferral_limit: Option<u32>,
}

impl Target for CommOverlapCallback {
    const TARGET: &'static str =
        "nemo.lightning.pytorch.callbacks.megatron_comm_overlap.MegatronCommOverlapCallback";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Callback {
    Timing(Node<TimingCallback>),
    CommOverlap(Node<CommOverlapCallback>),
}

impl Callback {
    #[must_use]
    pub fn timing() -> Self {
        Self::Timing(Node::default())
    }

    #[must_use]
    pub fn as_comm_overlap(&self) -> Option<&CommOverlapCallback> {
        match self {
            Self::CommOverlap(node) => Some(&**node),
            Self::Timing(_) => None,
        }
    }
}

impl From<CommOverlapCallback> for Callback {
    fn from(callback: CommOverlapCallback) -> Self {
        Self::CommOverlap(Node::new(callback))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    #[default]
    Gpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trainer {
    pub accelerator: Accelerator,
    pub accumulate_grad_batches: u32,
    #[serde(default)]
    pub callbacks: Vec<Callback>,
    pub devices: u32,
    pub limit_test_batches: u32,
    pub limit_val_batches: u32,
    pub log_every_n_steps: u32,
    pub max_steps: u64,
    pub num_nodes: u32,
    pub plugins: Option<Node<MixedPrecision>>,
    pub strategy: Node<MegatronStrategy>,
    pub use_distributed_sampler: bool,
    pub val_check_interval: u32,
}

impl Target for Trainer {
    const TARGET: &'static str = "nemo.lightning.Trainer";
}

impl Trainer {
    /// The first communication-overlap callback, if any.
    #[must_use]
    pub fn comm_overlap(&self) -> Option<&CommOverlapCallback> {
        self.callbacks.iter().find_map(Callback::as_comm_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_callbacks_read_back_by_target() {
        let callbacks = vec![
            Callback::timing(),
            Callback::from(CommOverlapCallback {
                tp_comm_overlap: Some(true),
                ..Default::default()
            }),
        ];
        let value = serde_json::to_value(&callbacks).unwrap();
        let parsed: Vec<Callback> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, callbacks);
        assert!(parsed[0].as_comm_overlap().is_none());
        assert_eq!(
            parsed[1].as_comm_overlap().unwrap().tp_comm_overlap,
            Some(true)
        );
    }

    #[test]
    fn test_comm_overlap_skips_unset_fields() {
        let callback = Callback::from(CommOverlapCallback {
            wgrad_deferral_limit: Some(22),
            ..Default::default()
        });
        let expected = json!({
            "_target_": CommOverlapCallback::TARGET,
            "wgrad_deferral_limit": 22,
        });
        assert_eq!(serde_json::to_value(&callback).unwrap(), expected);
    }

    #[test]
    fn test_unknown_callback_target_is_rejected() {
        let result = serde_json::from_value::<Callback>(json!({ "_target_": "somewhere.Else" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_accelerator_defaults_to_gpu() {
        assert_eq!(Accelerator::default(), Accelerator::Gpu);
        assert_eq!(
            serde_json::to_value(Accelerator::Gpu).unwrap(),
            json!("gpu")
        );
        assert!(serde_json::from_value::<Accelerator>(json!("cpu")).is_err());
    }
}
