//! Dotted-path overrides on a built configuration tree.
//!
//! `trainer.strategy.tensor_model_parallel_size=2` replaces one leaf. The
//! edited tree is read back into its typed form, so an override that breaks
//! the tree's shape or names a field the node does not have is an error.

use crate::error::{RecipeError, RecipeResult};
use crate::factory::parse_assignment;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: String,
    pub value: Value,
}

impl std::str::FromStr for Override {
    type Err = RecipeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (path, value) = parse_assignment(raw)
            .map_err(|reason| invalid(raw.trim(), reason))?;
        Ok(Self { path, value })
    }
}

fn invalid(path: &str, reason: String) -> RecipeError {
    RecipeError::InvalidOverride {
        path: path.to_string(),
        reason,
    }
}

pub fn apply_overrides<T: Serialize + DeserializeOwned>(
    config: &T,
    overrides: &[Override],
) -> RecipeResult<T> {
    let original = serde_json::to_value(config)?;
    let mut tree = original.clone();
    for o in overrides {
        set_path(&mut tree, o)?;
        debug!(path = %o.path, value = %o.value, "Applied override");
    }

    let updated: T = serde_json::from_value(tree.clone())
        .map_err(|e| invalid(&joined_paths(overrides), e.to_string()))?;

    // Unknown keys are dropped when the tree is read back; catch them here.
    let reread = serde_json::to_value(&updated)?;
    for o in overrides {
        if lookup(&reread, &o.path).is_some() {
            continue;
        }
        // An unset optional field serializes as nothing, so `None` on it
        // survives only as an absent key.
        let known = o.value.is_null()
            && (lookup(&original, &o.path).is_some() || is_known_field::<T>(&tree, o)?);
        if !known {
            return Err(invalid(&o.path, "no such field in the configuration".to_string()));
        }
    }

    Ok(updated)
}

/// Whether the typed form reads the key at `o.path`: a non-null value there
/// is either rejected or kept on read-back, while an unknown key is ignored.
fn is_known_field<T: Serialize + DeserializeOwned>(
    tree: &Value,
    o: &Override,
) -> RecipeResult<bool> {
    let mut trial = tree.clone();
    let placeholder = Override {
        path: o.path.clone(),
        value: Value::Bool(true),
    };
    set_path(&mut trial, &placeholder)?;

    match serde_json::from_value::<T>(trial) {
        Err(_) => Ok(true),
        Ok(parsed) => Ok(lookup(&serde_json::to_value(&parsed)?, &o.path).is_some()),
    }
}

fn joined_paths(overrides: &[Override]) -> String {
    let paths: Vec<&str> = overrides.iter().map(|o| o.path.as_str()).collect();
    paths.join(", ")
}

fn set_path(tree: &mut Value, o: &Override) -> RecipeResult<()> {
    let fail = |reason: String| invalid(&o.path, reason);
    let segments: Vec<&str> = o.path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(fail("empty path segment".to_string()));
    }

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| fail("empty path".to_string()))?;
    let mut current = tree;
    for segment in parents {
        current = match current {
            Value::Object(map) => map
                .get_mut(*segment)
                .ok_or_else(|| fail(format!("no field `{segment}`")))?,
            Value::Array(items) => {
                let idx = array_index(segment, items.len()).map_err(&fail)?;
                &mut items[idx]
            }
            _ => return Err(fail(format!("`{segment}` is inside a plain value"))),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), o.value.clone());
        }
        Value::Array(items) => {
            let idx = array_index(last, items.len()).map_err(&fail)?;
            items[idx] = o.value.clone();
        }
        _ => return Err(fail(format!("cannot set `{last}` on a plain value"))),
    }
    Ok(())
}

fn array_index(segment: &str, len: usize) -> Result<usize, String> {
    let idx: usize = segment
        .parse()
        .map_err(|_| format!("`{segment}` is not a list index"))?;
    if idx >= len {
        return Err(format!("index {idx} out of range (list has {len} entries)"));
    }
    Ok(idx)
}

fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(tree, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RunArgs;
    use crate::recipes::gpt3_175b;
    use crate::trainer::Callback;
    use serde_json::json;

    fn ov(raw: &str) -> Override {
        raw.parse().unwrap()
    }

    #[test]
    fn test_scalar_overrides() {
        let recipe = gpt3_175b::pretrain_recipe(RunArgs::default());
        let updated = apply_overrides(
            &recipe,
            &[
                ov("trainer.max_steps=100"),
                ov("trainer.strategy.tensor_model_parallel_size=2"),
                ov("optim.config.lr=3e-4"),
            ],
        )
        .unwrap();
        assert_eq!(updated.trainer.max_steps, 100);
        assert_eq!(updated.trainer.strategy.tensor_model_parallel_size, 2);
        assert!((updated.optim.config.lr - 3e-4).abs() < f64::EPSILON);
        assert_eq!(recipe.trainer.max_steps, 1_168_251);
    }

    #[test]
    fn test_list_index_and_optional_fields() {
        let recipe = gpt3_175b::pretrain_recipe_performance(RunArgs::default());
        let updated = apply_overrides(
            &recipe,
            &[
                ov("trainer.callbacks.1.wgrad_deferral_limit=10"),
                ov("trainer.callbacks.1.bucket_size=1000000"),
            ],
        )
        .unwrap();
        let overlap = updated.trainer.comm_overlap().unwrap();
        assert_eq!(overlap.wgrad_deferral_limit, Some(10));
        assert_eq!(overlap.bucket_size, Some(1_000_000));
    }

    #[test]
    fn test_unset_plugin() {
        let recipe = gpt3_175b::pretrain_recipe(RunArgs::default());
        let updated = apply_overrides(&recipe, &[ov("trainer.plugins=None")]).unwrap();
        assert!(updated.trainer.plugins.is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let recipe = gpt3_175b::pretrain_recipe(RunArgs::default());
        let err = apply_overrides(&recipe, &[ov("trainer.max_stepz=5")]).unwrap_err();
        assert!(err.to_string().contains("trainer.max_stepz"));

        assert!(apply_overrides(&recipe, &[ov("trainer.nothing.here=1")]).is_err());
        assert!(apply_overrides(&recipe, &[ov("trainer.callbacks.7.x=1")]).is_err());
    }

    #[test]
    fn test_unknown_field_set_to_none_is_rejected() {
        let recipe = gpt3_175b::pretrain_recipe_performance(RunArgs::default());
        for raw in [
            "trainer.max_stepz=None",
            "trainer.strategy.ckpt_include_optimzer=None",
            "trainer.callbacks.1.wgrad_deferal_limit=None",
        ] {
            let err = apply_overrides(&recipe, &[ov(raw)]).unwrap_err();
            assert!(matches!(err, RecipeError::InvalidOverride { .. }), "{raw}");
        }
    }

    #[test]
    fn test_known_optional_field_set_to_none() {
        let recipe = gpt3_175b::pretrain_recipe_performance(RunArgs::default());
        let updated = apply_overrides(
            &recipe,
            &[
                ov("trainer.strategy.ckpt_include_optimizer=None"),
                ov("trainer.callbacks.1.bucket_size=None"),
                ov("trainer.callbacks.1.wgrad_deferral_limit=None"),
            ],
        )
        .unwrap();
        assert_eq!(updated.trainer.strategy.ckpt_include_optimizer, None);
        let overlap = updated.trainer.comm_overlap().unwrap();
        assert_eq!(overlap.wgrad_deferral_limit, None);
        assert_eq!(overlap.tp_comm_overlap, Some(true));
    }

    #[test]
    fn test_shape_breaking_override_is_rejected() {
        let recipe = gpt3_175b::pretrain_recipe(RunArgs::default());
        assert!(apply_overrides(&recipe, &[ov("trainer.num_nodes='many'")]).is_err());
        assert!(
            apply_overrides(&recipe, &[ov("trainer.strategy._target_=other.Strategy")]).is_err()
        );
    }

    #[test]
    fn test_callbacks_keep_their_kind() {
        let recipe = gpt3_175b::pretrain_recipe_performance(RunArgs::default());
        let updated = apply_overrides(&recipe, &[ov("trainer.max_steps=7")]).unwrap();
        assert_eq!(updated.trainer.callbacks[0], Callback::timing());
    }

    #[test]
    fn test_lookup_walks_lists() {
        let tree = json!({ "a": [{ "b": 1 }] });
        assert_eq!(lookup(&tree, "a.0.b"), Some(&json!(1)));
        assert_eq!(lookup(&tree, "a.1.b"), None);
    }
}
