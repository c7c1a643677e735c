//! Tagged configuration nodes.
//!
//! A [`Node`] is a record of constructor arguments for a type that lives in the
//! external training runtime. It serializes as a flat map with a `_target_` key
//! naming that type, followed by the record's own fields:
//!
//! ```json
//! { "_target_": "nemo.lightning.AutoResume", "resume_if_exists": true, ... }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

/// A record type that can be instantiated by the external runtime.
pub trait Target {
    /// Fully qualified path of the external type this record configures.
    const TARGET: &'static str;

    /// Whether a serialized `_target_` tag can be read back into this record.
    ///
    /// Records shared by several external types (model architectures, for one)
    /// widen this check.
    fn accepts(target: &str) -> bool {
        target == Self::TARGET
    }
}

/// A configuration record tagged with the external type it instantiates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
    target: Cow<'static, str>,
    inner: T,
}

impl<T: Target> Node<T> {
    /// Tag `inner` with its default target.
    pub fn new(inner: T) -> Self {
        Self {
            target: Cow::Borrowed(T::TARGET),
            inner,
        }
    }

    /// Tag `inner` with an explicit target.
    pub fn with_target(target: impl Into<Cow<'static, str>>, inner: T) -> Self {
        Self {
            target: target.into(),
            inner,
        }
    }
}

impl<T: Target + Default> Default for Node<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Node<T> {
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl<T> Deref for Node<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Node<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Serialize> Serialize for Node<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, T> {
            #[serde(rename = "_target_")]
            target: &'a str,
            #[serde(flatten)]
            inner: &'a T,
        }

        Tagged {
            target: &self.target,
            inner: &self.inner,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Target + Deserialize<'de>> Deserialize<'de> for Node<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Tagged<T> {
            #[serde(rename = "_target_")]
            target: String,
            #[serde(flatten)]
            inner: T,
        }

        let tagged = Tagged::<T>::deserialize(deserializer)?;
        if !T::accepts(&tagged.target) {
            return Err(D::Error::custom(format!(
                "unexpected _target_ `{}` (expected `{}`)",
                tagged.target,
                T::TARGET
            )));
        }
        Ok(Self {
            target: Cow::Owned(tagged.target),
            inner: tagged.inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Widget {
        size: u32,
        label: Option<String>,
    }

    impl Target for Widget {
        const TARGET: &'static str = "runtime.Widget";
    }

    #[test]
    fn test_node_serializes_flat_with_target_tag() {
        let node = Node::new(Widget {
            size: 4,
            label: None,
        });
        let value = serde_json::to_value(&node).unwrap();
        let expected = json!({ "_target_": "runtime.Widget", "size": 4, "label": null });
        assert_eq!(value, expected);
    }

    #[test]
    fn test_node_rejects_foreign_target() {
        let foreign = json!({ "_target_": "runtime.Other", "size": 1 });
        let err = serde_json::from_value::<Node<Widget>>(foreign).unwrap_err();
        assert!(err.to_string().contains("runtime.Other"));
    }

    #[test]
    fn test_node_derefs_to_record() {
        let mut node = Node::<Widget>::default();
        node.size = 9;
        assert_eq!(node.size, 9);
        assert_eq!(node.target(), "runtime.Widget");
    }
}
