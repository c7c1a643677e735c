//! Named recipe factories.
//!
//! Maps the names used on the command line to the recipe builders, and
//! keyword arguments to each builder's argument struct.

use crate::error::{RecipeError, RecipeResult};
use crate::factory::{Kwargs, parse_factory_call};
use crate::model::{LanguageModel, architecture};
use crate::node::Node;
use crate::recipe::{PretrainRecipe, RunArgs};
use crate::recipes::{gpt3_175b, nemotron4_22b};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// A pretraining recipe reachable by name.
#[derive(Debug, Clone, Copy)]
pub struct PretrainFactory {
    pub name: &'static str,
    /// Alternative spellings, `<recipe>.<function>`.
    pub aliases: &'static [&'static str],
    pub summary: &'static str,
    defaults: fn() -> RecipeResult<Kwargs>,
    build: fn(&'static str, Kwargs) -> RecipeResult<PretrainRecipe>,
}

impl PretrainFactory {
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| *alias == name)
    }

    /// Every keyword the factory accepts, with its default value.
    pub fn defaults(&self) -> RecipeResult<Kwargs> {
        (self.defaults)()
    }

    pub fn build(&self, kwargs: Kwargs) -> RecipeResult<PretrainRecipe> {
        debug!(
            factory = self.name,
            keywords = kwargs.len(),
            "Building recipe from factory"
        );
        (self.build)(self.name, kwargs)
    }
}

fn defaults_of<T: Default + Serialize>() -> RecipeResult<Kwargs> {
    match serde_json::to_value(T::default())? {
        Value::Object(map) => Ok(map),
        other => Err(RecipeError::Config(format!("argument defaults are not a map: {other}"))),
    }
}

fn args_from<T: DeserializeOwned>(factory: &str, kwargs: Kwargs) -> RecipeResult<T> {
    serde_json::from_value(Value::Object(kwargs))
        .map_err(|e| RecipeError::InvalidArguments {
            factory: factory.to_string(),
            message: e.to_string(),
        })
}

fn build_gpt3_175b(factory: &'static str, kwargs: Kwargs) -> RecipeResult<PretrainRecipe> {
    Ok(gpt3_175b::pretrain_recipe(args_from(factory, kwargs)?))
}

fn build_gpt3_175b_performance(
    factory: &'static str,
    kwargs: Kwargs,
) -> RecipeResult<PretrainRecipe> {
    Ok(gpt3_175b::pretrain_recipe_performance(args_from(factory, kwargs)?))
}

fn build_nemotron4_22b(factory: &'static str, kwargs: Kwargs) -> RecipeResult<PretrainRecipe> {
    Ok(nemotron4_22b::pretrain_recipe(args_from(factory, kwargs)?))
}

fn build_nemotron4_22b_optimized(
    factory: &'static str,
    kwargs: Kwargs,
) -> RecipeResult<PretrainRecipe> {
    Ok(nemotron4_22b::pretrain_recipe_performance(args_from(factory, kwargs)?))
}

pub static PRETRAIN_FACTORIES: &[PretrainFactory] = &[
    PretrainFactory {
        name: "gpt3_175b",
        aliases: &["gpt3_175b.pretrain_recipe"],
        summary: "GPT3 175B pretraining on mock data",
        defaults: defaults_of::<RunArgs>,
        build: build_gpt3_175b,
    },
    PretrainFactory {
        name: "gpt3_175b_performance",
        aliases: &["gpt3_175b.pretrain_recipe_performance"],
        summary: "GPT3 175B with fp8 userbuffers TP overlap (H100)",
        defaults: defaults_of::<RunArgs>,
        build: build_gpt3_175b_performance,
    },
    PretrainFactory {
        name: "nemotron4_22b",
        aliases: &["nemotron4_22b.pretrain_recipe"],
        summary: "Nemotron4 22B pretraining on mock data",
        defaults: defaults_of::<nemotron4_22b::PretrainArgs>,
        build: build_nemotron4_22b,
    },
    PretrainFactory {
        name: "nemotron4_22b_optimized",
        aliases: &["nemotron4_22b.pretrain_recipe_performance"],
        summary: "Nemotron4 22B with bf16 gradient reduction and TP overlap",
        defaults: defaults_of::<nemotron4_22b::OptimizedArgs>,
        build: build_nemotron4_22b_optimized,
    },
];

pub fn pretrain_factory(name: &str) -> RecipeResult<&'static PretrainFactory> {
    PRETRAIN_FACTORIES
        .iter()
        .find(|f| f.matches(name))
        .ok_or_else(|| RecipeError::UnknownFactory(name.to_string()))
}

/// Build a recipe from a factory expression such as
/// `nemotron4_22b(num_nodes=2, name='trial')`.
pub fn build_pretrain(expr: &str) -> RecipeResult<PretrainRecipe> {
    let call = parse_factory_call(expr)?;
    pretrain_factory(&call.name)?.build(call.kwargs)
}

/// Model node for a model factory name (any architecture preset).
pub fn build_model(name: &str) -> RecipeResult<Node<LanguageModel>> {
    Ok(architecture(name)?.model())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_factory_builds_with_defaults() {
        for factory in PRETRAIN_FACTORIES {
            let recipe = factory.build(Kwargs::new()).unwrap();
            assert!(!recipe.trainer.callbacks.is_empty(), "{}", factory.name);
            assert!(recipe.data.global_batch_size > 0, "{}", factory.name);
            assert_eq!(recipe.resume.target(), "nemo.lightning.AutoResume");

            let value = serde_json::to_value(&recipe).unwrap();
            for branch in ["model", "trainer", "data", "log", "optim", "resume"] {
                assert!(
                    !value[branch].is_null(),
                    "{} is missing {branch}",
                    factory.name
                );
            }
        }
    }

    #[test]
    fn test_aliases_resolve() {
        let gpt3 = pretrain_factory("gpt3_175b.pretrain_recipe_performance").unwrap();
        assert_eq!(gpt3.name, "gpt3_175b_performance");
        let nemotron = pretrain_factory("nemotron4_22b.pretrain_recipe_performance").unwrap();
        assert_eq!(nemotron.name, "nemotron4_22b_optimized");

        let unknown = pretrain_factory("llama3_8b");
        assert!(matches!(unknown, Err(RecipeError::UnknownFactory(_))));
    }

    #[test]
    fn test_expression_builds_boundary_scenario() {
        let recipe = build_pretrain("gpt3_175b(num_nodes=64, num_gpus_per_node=8)").unwrap();
        assert_eq!(recipe.trainer.num_nodes, 64);
        assert_eq!(recipe.trainer.devices, 8);
        assert_eq!(recipe.trainer.strategy.tensor_model_parallel_size, 4);
        assert_eq!(recipe.trainer.strategy.pipeline_model_parallel_size, 8);
    }

    #[test]
    fn test_optimized_expression() {
        let recipe = build_pretrain("nemotron4_22b_optimized").unwrap();
        let overlap = recipe.trainer.comm_overlap().unwrap();
        assert_eq!(overlap.wgrad_deferral_limit, Some(22));
    }

    #[test]
    fn test_unknown_keyword_is_rejected() {
        let err = build_pretrain("gpt3_175b(tensor_parallelism=2)").unwrap_err();
        match err {
            RecipeError::InvalidArguments { factory, message } => {
                assert_eq!(factory, "gpt3_175b");
                assert!(message.contains("tensor_parallelism"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_ill_typed_keyword_is_rejected() {
        assert!(build_pretrain("nemotron4_22b(num_nodes='many')").is_err());
        assert!(build_pretrain("nemotron4_22b(precision='int4')").is_err());
    }

    #[test]
    fn test_defaults_list_accepted_keywords() {
        let base = pretrain_factory("nemotron4_22b").unwrap();
        let defaults = base.defaults().unwrap();
        assert_eq!(defaults["max_steps"], json!(300_000));
        assert_eq!(defaults["precision"], json!("bf16-mixed"));
        assert!(defaults.contains_key("fn"));

        let optimized = pretrain_factory("nemotron4_22b_optimized").unwrap();
        let optimized = optimized.defaults().unwrap();
        assert_eq!(optimized["num_nodes"], json!(8));
        assert_eq!(optimized.len(), 5);
    }

    #[test]
    fn test_build_model() {
        assert_eq!(build_model("gpt3_175b").unwrap().config.num_layers, 96);
        assert!(build_model("gpt3_175b_performance").is_err());
    }
}
