//! Summary shown on the last wizard step.

use crate::config::PresetCatalog;
use crate::models::{Configuration, OptimizationFlag};

/// Items shown before a list is abbreviated.
const MAX_LISTED: usize = 5;
const EMPTY_PLACEHOLDER: &str = "无";

/// Render a selection list for the summary.
///
/// Up to five items are joined with `", "`; longer lists show the first five
/// followed by the total count, and an empty list shows a placeholder.
pub fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    let shown = items
        .iter()
        .take(MAX_LISTED)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > MAX_LISTED {
        format!("{} 等{}种", shown, items.len())
    } else {
        shown
    }
}

/// Rendered values of the summary, one string per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    pub preset: String,
    pub api: String,
    pub output_type: String,
    pub architectures: String,
    pub decoders: String,
    pub encoders: String,
    pub muxers: String,
    pub demuxers: String,
    pub protocols: String,
    pub filters: String,
    pub optimizations: String,
}

impl ConfigSummary {
    pub fn from_config(config: &Configuration) -> Self {
        let enabled: Vec<String> = OptimizationFlag::ALL
            .iter()
            .filter(|flag| config.optimizations.get(**flag))
            .map(|flag| flag.as_str().to_string())
            .collect();

        ConfigSummary {
            preset: config.preset.clone(),
            api: format!("API {}", config.api),
            output_type: config.output_type.to_string(),
            architectures: format_list(&config.architectures),
            decoders: format_list(&config.decoders),
            encoders: format_list(&config.encoders),
            muxers: format_list(&config.muxers),
            demuxers: format_list(&config.demuxers),
            protocols: format_list(&config.protocols),
            filters: format_list(&config.filters),
            optimizations: format_list(&enabled),
        }
    }

    /// Labelled rows; the preset shows its display name when the catalog knows it.
    pub fn rows(&self, catalog: &PresetCatalog) -> Vec<(&'static str, String)> {
        vec![
            ("预设", catalog.display_name(&self.preset).to_string()),
            ("API级别", self.api.clone()),
            ("输出类型", self.output_type.clone()),
            ("目标架构", self.architectures.clone()),
            ("解码器", self.decoders.clone()),
            ("编码器", self.encoders.clone()),
            ("复用器", self.muxers.clone()),
            ("解复用器", self.demuxers.clone()),
            ("网络协议", self.protocols.clone()),
            ("滤镜", self.filters.clone()),
            ("优化选项", self.optimizations.clone()),
        ]
    }
}
