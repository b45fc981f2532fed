//! Build presets served by the backend.
//!
//! The catalog is read-only on the client: it is fetched once per session and
//! only looked up afterwards.

use std::collections::{BTreeMap, HashMap};

use crate::backend::BackendApi;
use crate::error::BackendError;
use crate::models::Preset;

/// Presets keyed by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    pub fn new(presets: HashMap<String, Preset>) -> Self {
        let presets = presets
            .into_iter()
            .map(|(id, mut preset)| {
                preset.id = id.clone();
                (id, preset)
            })
            .collect();
        PresetCatalog { presets }
    }

    /// Lookup by id, ignoring case.
    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets
            .get(id)
            .or_else(|| self.presets.values().find(|p| p.id.eq_ignore_ascii_case(id)))
    }

    /// Display name for a preset id, or the id itself when unknown.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        match self.get(id) {
            Some(preset) if !preset.name.is_empty() => &preset.name,
            _ => id,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// Fetches presets from the backend.
pub struct PresetRegistry;

impl PresetRegistry {
    /// Fetch the full catalog. A failed fetch is logged and yields an empty catalog
    /// together with the error, so the caller can still run with defaults.
    pub async fn fetch(backend: &dyn BackendApi) -> (PresetCatalog, Option<BackendError>) {
        match backend.fetch_presets().await {
            Ok(presets) => {
                let catalog = PresetCatalog::new(presets);
                log::info!("[Presets] Loaded {} presets", catalog.len());
                (catalog, None)
            }
            Err(e) => {
                log::error!("[Presets] 加载预设失败: {}", e);
                (PresetCatalog::default(), Some(e))
            }
        }
    }

    /// Fetch a single preset by id.
    pub async fn fetch_one(backend: &dyn BackendApi, id: &str) -> Result<Preset, BackendError> {
        let preset = backend.fetch_preset(id).await?;
        log::debug!("[Presets] Fetched preset '{}'", preset.id);
        Ok(preset)
    }
}
