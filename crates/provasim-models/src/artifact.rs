//! On-disk model format and its evaluator.
//!
//! Trees use the flattened array layout of gradient-boosting dumps:
//! parallel arrays indexed by internal node, with negative child
//! values encoding leaves (`leaf index = -child - 1`). Features are
//! the 45 binary pattern entries.

use serde::{Deserialize, Serialize};

use provasim_core::scorer::PATTERN_LEN;
use provasim_core::traits::AbilityModel;

/// One regression tree in flattened form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Feature index tested at each internal node.
    pub split_feature: Vec<u32>,
    /// Decision threshold at each internal node; `<=` goes left.
    pub threshold: Vec<f64>,
    /// Left child per internal node. Negative values are leaves.
    pub left_child: Vec<i32>,
    /// Right child per internal node. Negative values are leaves.
    pub right_child: Vec<i32>,
    /// Output value per leaf.
    pub leaf_value: Vec<f64>,
}

impl Tree {
    /// Walk the tree for one feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        // Single-leaf trees have no internal nodes at all.
        if self.split_feature.is_empty() {
            return self.leaf_value.first().copied().unwrap_or(0.0);
        }

        let mut node = 0usize;
        loop {
            let feature = self.split_feature[node] as usize;
            let value = features.get(feature).copied().unwrap_or(0.0);
            let child = if value <= self.threshold[node] {
                self.left_child[node]
            } else {
                self.right_child[node]
            };
            if child < 0 {
                return self.leaf_value[(-child - 1) as usize];
            }
            node = child as usize;
        }
    }

    fn validate(&self, index: usize) -> Result<(), String> {
        let nodes = self.split_feature.len();
        if self.threshold.len() != nodes
            || self.left_child.len() != nodes
            || self.right_child.len() != nodes
        {
            return Err(format!("tree {index}: node array lengths differ"));
        }
        if nodes == 0 && self.leaf_value.is_empty() {
            return Err(format!("tree {index}: no nodes and no leaves"));
        }

        for (node, &feature) in self.split_feature.iter().enumerate() {
            if feature as usize >= PATTERN_LEN {
                return Err(format!(
                    "tree {index} node {node}: feature {feature} out of range"
                ));
            }
        }
        for (node, &child) in self
            .left_child
            .iter()
            .chain(self.right_child.iter())
            .enumerate()
        {
            let ok = if child < 0 {
                ((-child - 1) as usize) < self.leaf_value.len()
            } else {
                (child as usize) < nodes
            };
            if !ok {
                return Err(format!("tree {index} node {node}: child {child} out of range"));
            }
        }
        Ok(())
    }
}

/// A complete model artifact: tree ensemble plus a base score.
///
/// The year/subject fields are informative metadata; discovery goes by
/// file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub subject: Option<String>,
    /// Score added before any tree contribution.
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl ModelArtifact {
    /// Evaluate the ensemble over a binary pattern.
    pub fn predict(&self, pattern: &[u8]) -> f64 {
        let features: Vec<f64> = pattern.iter().map(|&b| f64::from(b)).collect();
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.predict(&features))
                .sum::<f64>()
    }

    /// Structural validation: consistent array lengths and in-range
    /// feature/child indexes.
    pub fn validate(&self) -> Result<(), String> {
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index)?;
        }
        Ok(())
    }
}

/// An artifact wrapped as a core [`AbilityModel`].
#[derive(Debug)]
pub struct GbtAbilityModel {
    artifact: ModelArtifact,
    id: String,
}

impl GbtAbilityModel {
    pub fn new(artifact: ModelArtifact, id: impl Into<String>) -> Self {
        Self {
            artifact,
            id: id.into(),
        }
    }
}

impl AbilityModel for GbtAbilityModel {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn predict(&self, pattern: &[u8]) -> f64 {
        self.artifact.predict(pattern)
    }
}
