//! Tensor-parallel communication overlap profiles.
//!
//! Each profile assigns an overlap method to every GEMM of a transformer layer.
//! The profiles are tuned for a given GPU, hidden size, TP degree, micro batch
//! size and sequence length, which is what their names spell out.

use crate::node::{Node, Target};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOverlap {
    pub num_sm: u32,
    pub cga_size: u32,
    pub set_sm_margin: bool,
}

impl Target for BulkOverlap {
    const TARGET: &'static str =
        "nemo.collections.llm.recipes.tp_overlap_configs.userbuffers.BulkOverlapCfg";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingExchangeOverlap {
    pub aggregate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_sm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_sm_margin: Option<bool>,
}

impl Target for RingExchangeOverlap {
    const TARGET: &'static str =
        "nemo.collections.llm.recipes.tp_overlap_configs.userbuffers.RingExchangeOverlapCfg";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOverlap {
    pub num_sm: u32,
    pub cga_size: u32,
    pub num_splits: u32,
    pub set_sm_margin: bool,
    #[serde(default)]
    pub fp8_buf: bool,
}

impl Target for PipelineOverlap {
    const TARGET: &'static str =
        "nemo.collections.llm.recipes.tp_overlap_configs.userbuffers.PipelineOverlapCfg";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverlapMethod {
    Bulk(Node<BulkOverlap>),
    RingExchange(Node<RingExchangeOverlap>),
    Pipeline(Node<PipelineOverlap>),
}

impl OverlapMethod {
    fn bulk(num_sm: u32) -> Self {
        Self::Bulk(Node::new(BulkOverlap {
            num_sm,
            cga_size: 2,
            set_sm_margin: false,
        }))
    }

    fn ring_exchange() -> Self {
        Self::RingExchange(Node::new(RingExchangeOverlap {
            aggregate: false,
            num_sm: None,
            set_sm_margin: None,
        }))
    }

    fn pipeline(num_sm: u32, fp8_buf: bool) -> Self {
        Self::Pipeline(Node::new(PipelineOverlap {
            num_sm,
            cga_size: 2,
            num_splits: 4,
            set_sm_margin: true,
            fp8_buf,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bulk(_) => "bulk",
            Self::RingExchange(_) => "ring_exchange",
            Self::Pipeline(_) => "pipeline",
        }
    }
}

/// Overlap method per transformer-layer GEMM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerLayerTpOverlap {
    pub qkv_dgrad: OverlapMethod,
    pub qkv_wgrad: OverlapMethod,
    pub fc1_dgrad: OverlapMethod,
    pub fc1_wgrad: OverlapMethod,
    pub qkv_fprop: OverlapMethod,
    pub proj_dgrad: OverlapMethod,
    pub fc1_fprop: OverlapMethod,
    pub fc2_dgrad: OverlapMethod,
    pub proj_fprop: OverlapMethod,
    pub fc2_fprop: OverlapMethod,
}

impl Target for TransformerLayerTpOverlap {
    const TARGET: &'static str =
        "nemo.collections.llm.recipes.tp_overlap_configs.userbuffers.TransformerLayerTPOverlapCfg";
}

impl TransformerLayerTpOverlap {
    /// Bulk overlap on the dgrad/wgrad GEMMs and ring exchange on the rest,
    /// shared by the h12288/tp4 profiles.
    fn h12288_tp4(proj_fprop: OverlapMethod, fc2_fprop: OverlapMethod) -> Self {
        Self {
            qkv_dgrad: OverlapMethod::bulk(4),
            qkv_wgrad: OverlapMethod::bulk(8),
            fc1_dgrad: OverlapMethod::bulk(2),
            fc1_wgrad: OverlapMethod::bulk(4),
            qkv_fprop: OverlapMethod::ring_exchange(),
            proj_dgrad: OverlapMethod::ring_exchange(),
            fc1_fprop: OverlapMethod::ring_exchange(),
            fc2_dgrad: OverlapMethod::ring_exchange(),
            proj_fprop,
            fc2_fprop,
        }
    }
}

pub const USERBUFFERS_BF16_H100_H12288_TP4_MBS1_SEQLEN2048: &str =
    "userbuffers_bf16_h100_h12288_tp4_mbs1_seqlen2048";
pub const USERBUFFERS_FP8_H100_H12288_TP4_MBS1_SEQLEN2048: &str =
    "userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048";

pub fn userbuffers_bf16_h100_h12288_tp4_mbs1_seqlen2048() -> Node<TransformerLayerTpOverlap> {
    Node::new(TransformerLayerTpOverlap::h12288_tp4(
        OverlapMethod::pipeline(24, false),
        OverlapMethod::pipeline(16, false),
    ))
}

pub fn userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048() -> Node<TransformerLayerTpOverlap> {
    let fc2_fprop = OverlapMethod::RingExchange(Node::new(RingExchangeOverlap {
        aggregate: false,
        num_sm: Some(1),
        set_sm_margin: Some(true),
    }));
    let proj_fprop = OverlapMethod::pipeline(24, true);
    Node::new(TransformerLayerTpOverlap::h12288_tp4(proj_fprop, fc2_fprop))
}

/// A named overlap profile.
#[derive(Debug, Clone, Copy)]
pub struct TpOverlapProfile {
    pub name: &'static str,
    pub summary: &'static str,
    build: fn() -> Node<TransformerLayerTpOverlap>,
}

impl TpOverlapProfile {
    #[must_use]
    pub fn build(&self) -> Node<TransformerLayerTpOverlap> {
        (self.build)()
    }
}

pub static TP_OVERLAP_PROFILES: &[TpOverlapProfile] = &[
    TpOverlapProfile {
        name: USERBUFFERS_BF16_H100_H12288_TP4_MBS1_SEQLEN2048,
        summary: "H100, hidden 12288, TP4, mbs 1, seq 2048, bf16",
        build: userbuffers_bf16_h100_h12288_tp4_mbs1_seqlen2048,
    },
    TpOverlapProfile {
        name: USERBUFFERS_FP8_H100_H12288_TP4_MBS1_SEQLEN2048,
        summary: "H100, hidden 12288, TP4, mbs 1, seq 2048, fp8",
        build: userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048,
    },
];

/// Look up an overlap profile by name.
pub fn tp_overlap_profile(name: &str) -> Option<&'static TpOverlapProfile> {
    TP_OVERLAP_PROFILES.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_differ_only_in_fprop_tail() {
        let bf16 = userbuffers_bf16_h100_h12288_tp4_mbs1_seqlen2048();
        let fp8 = userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048();

        assert_eq!(bf16.qkv_dgrad, fp8.qkv_dgrad);
        assert_eq!(bf16.fc2_dgrad, fp8.fc2_dgrad);
        assert_eq!(bf16.fc2_fprop.name(), "pipeline");
        assert_eq!(fp8.fc2_fprop.name(), "ring_exchange");
        match &fp8.proj_fprop {
            OverlapMethod::Pipeline(cfg) => assert!(cfg.fp8_buf),
            other => panic!("unexpected proj_fprop method {}", other.name()),
        }
    }

    #[test]
    fn test_profile_lookup_by_name() {
        let name = USERBUFFERS_FP8_H100_H12288_TP4_MBS1_SEQLEN2048;
        let profile = tp_overlap_profile(name).unwrap();
        let expected = userbuffers_fp8_h100_h12288_tp4_mbs1_seqlen2048();
        assert_eq!(profile.build(), expected);
        assert!(tp_overlap_profile("userbuffers_unknown").is_none());
    }

    #[test]
    fn test_profile_reads_back_from_json() {
        let node = userbuffers_bf16_h100_h12288_tp4_mbs1_seqlen2048();
        let value = serde_json::to_value(&node).unwrap();
        let parsed: Node<TransformerLayerTpOverlap> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, node);
    }
}
