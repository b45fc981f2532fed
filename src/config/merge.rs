//! Two-level preset merge.
//!
//! Top-level fields present in the patch replace the configuration's value
//! wholesale. The nested optimization record merges key by key: each switch
//! present in the patch overrides, each absent switch keeps its prior value.

use crate::models::{ConfigPatch, Configuration, OptimizationFlag, OptimizationFlags, OptimizationPatch};

/// Merge `patch` over `base`, returning the merged configuration.
///
/// `base` is not modified; fields absent from the patch are copied through
/// untouched.
pub fn merge_patch(base: &Configuration, patch: &ConfigPatch) -> Configuration {
    let mut merged = base.clone();

    if let Some(preset) = &patch.preset {
        merged.preset = preset.clone();
    }
    if let Some(api) = patch.api {
        merged.api = api;
    }
    if let Some(output_type) = patch.output_type {
        merged.output_type = output_type;
    }

    replace_list(&mut merged.architectures, &patch.architectures);
    replace_list(&mut merged.decoders, &patch.decoders);
    replace_list(&mut merged.encoders, &patch.encoders);
    replace_list(&mut merged.muxers, &patch.muxers);
    replace_list(&mut merged.demuxers, &patch.demuxers);
    replace_list(&mut merged.protocols, &patch.protocols);
    replace_list(&mut merged.filters, &patch.filters);

    if let Some(optimizations) = &patch.optimizations {
        merged.optimizations = merge_optimizations(&base.optimizations, optimizations);
    }

    merged
}

/// Per-key merge of the optimization record.
pub fn merge_optimizations(base: &OptimizationFlags, patch: &OptimizationPatch) -> OptimizationFlags {
    let mut merged = *base;
    for flag in OptimizationFlag::ALL {
        if let Some(value) = patch.get(flag) {
            merged.set(flag, value);
        }
    }
    merged
}

fn replace_list(target: &mut Vec<String>, source: &Option<Vec<String>>) {
    if let Some(items) = source {
        *target = dedup_preserving_order(items);
    }
}

/// Drop repeated entries, keeping the first occurrence.
pub fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
