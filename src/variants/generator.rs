//! Variant generator for autosuggest expansion

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Pattern;
use crate::types::VariantType;

/// Ordered queries generated for one variant type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantGroup {
    pub variant_type: VariantType,
    pub queries: Vec<String>,
}

/// Deterministic expansion of a base keyword into variant groups
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantGenerator;

impl VariantGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Expand `base` for every requested type.
    ///
    /// A query already produced by an earlier type (in registry order) is not
    /// repeated, so each query belongs to exactly one group.
    pub fn generate(&self, base: &str, types: &[VariantType]) -> BTreeMap<VariantType, Vec<String>> {
        let mut requested: Vec<VariantType> = types.to_vec();
        requested.sort();
        requested.dedup();

        let mut seen = HashSet::new();
        let mut variants = BTreeMap::new();

        for variant_type in requested {
            let queries: Vec<String> = Pattern::for_type(variant_type)
                .expand(base)
                .into_iter()
                .filter(|q| seen.insert(q.clone()))
                .collect();
            variants.insert(variant_type, queries);
        }

        variants
    }

    /// Same as [`generate`](Self::generate) but from raw tags. Unknown tags are skipped.
    pub fn generate_from_tags(&self, base: &str, tags: &[&str]) -> BTreeMap<VariantType, Vec<String>> {
        let types: Vec<VariantType> = tags
            .iter()
            .filter_map(|tag| match VariantType::from_str(tag) {
                Ok(t) => Some(t),
                Err(_) => {
                    tracing::debug!(tag = %tag, "Skipping unknown variant type");
                    None
                }
            })
            .collect();
        self.generate(base, &types)
    }

    /// Generated groups in registry order
    pub fn groups(&self, base: &str, types: &[VariantType]) -> Vec<VariantGroup> {
        self.generate(base, types)
            .into_iter()
            .map(|(variant_type, queries)| VariantGroup { variant_type, queries })
            .collect()
    }

    /// Total number of queries the request will produce
    pub fn total_variants(&self, base: &str, types: &[VariantType]) -> usize {
        self.generate(base, types).values().map(Vec::len).sum()
    }
}
