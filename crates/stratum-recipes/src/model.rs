//! Model architectures and their named presets.

use crate::error::{RecipeError, RecipeResult};
use crate::node::{Node, Target};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    LayerNorm,
    RMSNorm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Gelu,
    SquaredRelu,
    Silu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionEmbedding {
    LearnedAbsolute,
    Rope,
}

/// Transformer hyperparameters for one model size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub num_layers: u32,
    pub seq_length: u32,
    pub hidden_size: u32,
    pub ffn_hidden_size: u32,
    pub num_attention_heads: u32,
    pub num_query_groups: Option<u32>,
    pub kv_channels: Option<u32>,
    pub init_method_std: f64,
    pub hidden_dropout: f64,
    pub attention_dropout: f64,
    pub normalization: Normalization,
    pub activation_func: Activation,
    pub position_embedding_type: PositionEmbedding,
    pub rotary_percent: f64,
    pub share_embeddings_and_output_weights: bool,
    pub add_bias_linear: bool,
    pub bias_activation_fusion: bool,
    pub bias_dropout_add_fusion: bool,
    pub masked_softmax_fusion: bool,
    pub persist_layer_norm: bool,
    pub layernorm_zero_centered_gamma: bool,
}

impl Target for ArchitectureConfig {
    const TARGET: &'static str = "nemo.collections.llm.gpt.model.GPTConfig";

    fn accepts(target: &str) -> bool {
        target == Self::TARGET || ARCHITECTURES.iter().any(|p| p.config_target == target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Gpt,
    Nemotron,
}

impl ModelFamily {
    #[must_use]
    pub fn model_target(self) -> &'static str {
        match self {
            Self::Gpt => "nemo.collections.llm.gpt.model.GPTModel",
            Self::Nemotron => "nemo.collections.llm.gpt.model.NemotronModel",
        }
    }
}

/// Lightning module wrapping an architecture config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModel {
    pub config: Node<ArchitectureConfig>,
}

impl Target for LanguageModel {
    const TARGET: &'static str = "nemo.collections.llm.gpt.model.GPTModel";

    fn accepts(target: &str) -> bool {
        target == ModelFamily::Gpt.model_target() || target == ModelFamily::Nemotron.model_target()
    }
}

/// A named model size with fixed hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitecturePreset {
    pub name: &'static str,
    pub family: ModelFamily,
    pub config_target: &'static str,
    pub config: ArchitectureConfig,
}

impl ArchitecturePreset {
    /// Fresh model node for this preset.
    #[must_use]
    pub fn model(&self) -> Node<LanguageModel> {
        let config = Node::with_target(self.config_target, self.config.clone());
        Node::with_target(self.family.model_target(), LanguageModel { config })
    }
}

const fn nemotron(
    num_layers: u32,
    hidden_size: u32,
    ffn_hidden_size: u32,
    num_attention_heads: u32,
    num_query_groups: Option<u32>,
    kv_channels: Option<u32>,
    init_method_std: f64,
) -> ArchitectureConfig {
    ArchitectureConfig {
        num_layers,
        seq_length: 4096,
        hidden_size,
        ffn_hidden_size,
        num_attention_heads,
        num_query_groups,
        kv_channels,
        init_method_std,
        hidden_dropout: 0.0,
        attention_dropout: 0.0,
        normalization: Normalization::LayerNorm,
        activation_func: Activation::SquaredRelu,
        position_embedding_type: PositionEmbedding::Rope,
        rotary_percent: 0.5,
        share_embeddings_and_output_weights: false,
        add_bias_linear: false,
        bias_activation_fusion: false,
        bias_dropout_add_fusion: false,
        masked_softmax_fusion: true,
        persist_layer_norm: true,
        layernorm_zero_centered_gamma: true,
    }
}

pub const GPT3_175B: ArchitecturePreset = ArchitecturePreset {
    name: "gpt3_175b",
    family: ModelFamily::Gpt,
    config_target: "nemo.collections.llm.gpt.model.GPTConfig175B",
    config: ArchitectureConfig {
        num_layers: 96,
        seq_length: 2048,
        hidden_size: 12288,
        ffn_hidden_size: 49152,
        num_attention_heads: 96,
        num_query_groups: None,
        kv_channels: None,
        init_method_std: 0.02,
        hidden_dropout: 0.0,
        attention_dropout: 0.0,
        normalization: Normalization::LayerNorm,
        activation_func: Activation::Gelu,
        position_embedding_type: PositionEmbedding::LearnedAbsolute,
        rotary_percent: 1.0,
        share_embeddings_and_output_weights: true,
        add_bias_linear: true,
        bias_activation_fusion: true,
        bias_dropout_add_fusion: true,
        masked_softmax_fusion: true,
        persist_layer_norm: false,
        layernorm_zero_centered_gamma: true,
    },
};

pub const NEMOTRON3_4B: ArchitecturePreset = ArchitecturePreset {
    name: "nemotron3_4b",
    family: ModelFamily::Nemotron,
    config_target: "nemo.collections.llm.gpt.model.Nemotron3Config4B",
    config: nemotron(32, 3072, 9216, 24, Some(8), Some(128), 0.0134),
};

pub const NEMOTRON3_8B: ArchitecturePreset = ArchitecturePreset {
    name: "nemotron3_8b",
    family: ModelFamily::Nemotron,
    config_target: "nemo.collections.llm.gpt.model.Nemotron3Config8B",
    config: nemotron(32, 4096, 16384, 32, None, None, 0.010),
};

pub const NEMOTRON4_15B: ArchitecturePreset = ArchitecturePreset {
    name: "nemotron4_15b",
    family: ModelFamily::Nemotron,
    config_target: "nemo.collections.llm.gpt.model.Nemotron4Config15B",
    config: nemotron(32, 6144, 24576, 48, Some(8), None, 0.0134),
};

pub const NEMOTRON4_22B: ArchitecturePreset = ArchitecturePreset {
    name: "nemotron4_22b",
    family: ModelFamily::Nemotron,
    config_target: "nemo.collections.llm.gpt.model.Nemotron4Config22B",
    config: nemotron(40, 6144, 24576, 48, Some(8), None, 0.008),
};

pub const NEMOTRON4_340B: ArchitecturePreset = ArchitecturePreset {
    name: "nemotron4_340b",
    family: ModelFamily::Nemotron,
    config_target: "nemo.collections.llm.gpt.model.Nemotron4Config340B",
    config: nemotron(96, 18432, 73728, 96, Some(8), None, 0.0063),
};

/// Every known architecture, keyed by `name`.
pub static ARCHITECTURES: &[ArchitecturePreset] =
    &[GPT3_175B, NEMOTRON3_4B, NEMOTRON3_8B, NEMOTRON4_15B, NEMOTRON4_22B, NEMOTRON4_340B];

pub fn architecture(name: &str) -> RecipeResult<&'static ArchitecturePreset> {
    ARCHITECTURES
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| RecipeError::UnknownPreset(name.to_string()))
}
