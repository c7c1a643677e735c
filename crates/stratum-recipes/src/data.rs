use crate::node::{Node, Target};
use serde::{Deserialize, Serialize};

/// Synthetic token data module used by pretraining recipes until a real
/// dataset is swapped in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDataModule {
    pub seq_length: u32,
    pub global_batch_size: u32,
    pub micro_batch_size: u32,
}

impl Target for MockDataModule {
    const TARGET: &'static str = "nemo.collections.llm.gpt.data.mock.MockDataModule";
}

pub fn mock_data(
    seq_length: u32,
    global_batch_size: u32,
    micro_batch_size: u32,
) -> Node<MockDataModule> {
    Node::new(MockDataModule {
        seq_length,
        global_batch_size,
        micro_batch_size,
    })
}
