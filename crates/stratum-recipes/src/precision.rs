//! Numeric precision modes and mixed-precision plugins.

use crate::node::{Node, Target};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tensor element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Float16,
    Bfloat16,
}

/// Trainer precision mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    #[serde(rename = "32", alias = "fp32")]
    Fp32,
    #[serde(rename = "16-mixed")]
    Fp16Mixed,
    #[default]
    #[serde(rename = "bf16-mixed")]
    Bf16Mixed,
}

impl Precision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fp32 => "32",
            Self::Fp16Mixed => "16-mixed",
            Self::Bf16Mixed => "bf16-mixed",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fp8Format {
    Hybrid,
    E4m3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmaxComputeAlgo {
    Max,
    MostRecent,
}

/// Megatron mixed-precision plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedPrecision {
    pub precision: Precision,
    pub params_dtype: DType,
    pub pipeline_dtype: DType,
    pub autocast_enabled: bool,
    pub grad_reduce_in_fp32: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp8: Option<Fp8Format>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp8_margin: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp8_amax_history_len: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp8_amax_compute_algo: Option<AmaxComputeAlgo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp8_params: Option<bool>,
}

impl Target for MixedPrecision {
    const TARGET: &'static str =
        "nemo.lightning.pytorch.plugins.mixed_precision.MegatronMixedPrecision";
}

impl MixedPrecision {
    fn half(precision: Precision, dtype: DType, grad_reduce_in_fp32: bool) -> Self {
        Self {
            precision,
            params_dtype: dtype,
            pipeline_dtype: dtype,
            autocast_enabled: false,
            grad_reduce_in_fp32,
            fp8: None,
            fp8_margin: None,
            fp8_amax_history_len: None,
            fp8_amax_compute_algo: None,
            fp8_params: None,
        }
    }

    fn with_hybrid_fp8(mut self) -> Self {
        self.fp8 = Some(Fp8Format::Hybrid);
        self.fp8_margin = Some(0);
        self.fp8_amax_history_len = Some(1024);
        self.fp8_amax_compute_algo = Some(AmaxComputeAlgo::Max);
        self.fp8_params = Some(true);
        self
    }
}

pub fn bf16_mixed() -> Node<MixedPrecision> {
    Node::new(MixedPrecision::half(Precision::Bf16Mixed, DType::Bfloat16, true))
}

pub fn fp16_mixed() -> Node<MixedPrecision> {
    Node::new(MixedPrecision::half(Precision::Fp16Mixed, DType::Float16, false))
}

/// bf16 mixed precision with hybrid fp8 compute on top.
pub fn bf16_with_fp8_mixed() -> Node<MixedPrecision> {
    let plugin = MixedPrecision::half(Precision::Bf16Mixed, DType::Bfloat16, true);
    Node::new(plugin.with_hybrid_fp8())
}

pub fn fp16_with_fp8_mixed() -> Node<MixedPrecision> {
    let plugin = MixedPrecision::half(Precision::Fp16Mixed, DType::Float16, false);
    Node::new(plugin.with_hybrid_fp8())
}

/// Plugin for a trainer precision mode. Full fp32 runs without a plugin.
pub fn plugin_for(precision: Precision) -> Option<Node<MixedPrecision>> {
    match precision {
        Precision::Fp32 => None,
        Precision::Fp16Mixed => Some(fp16_mixed()),
        Precision::Bf16Mixed => Some(bf16_mixed()),
    }
}
