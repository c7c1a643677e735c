//! Pretraining recipes, one module per model.
//!
//! Each module exposes `model()`, `pretrain_recipe(..)` and a performance
//! variant that builds the base recipe and tunes the fresh copy.

pub mod gpt3_175b;
pub mod nemotron;
pub mod nemotron4_22b;
