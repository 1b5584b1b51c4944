use crate::normalize::{is_valid_relay_url, normalize_url};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use url::Url;

#[derive(thiserror::Error, Debug)]
#[error("'{0}' is not a usable relay url")]
pub struct InvalidRelay(pub String);

/// the endpoints every fan-out goes to: defaults, the user's pick and any presets
#[derive(Debug)]
pub struct RelaySet {
    defaults: Vec<String>,
    presets: Vec<String>,
    selected: RwLock<Option<String>>,
}

impl RelaySet {
    pub fn new(defaults: Vec<String>, presets: Vec<String>) -> Self {
        Self {
            defaults,
            presets,
            selected: RwLock::new(None),
        }
    }

    /// select an extra relay; takes effect for the next fan-out, not the ones in flight
    pub fn select(&self, url: &str) -> Result<(), InvalidRelay> {
        if !is_valid_relay_url(url) {
            return Err(InvalidRelay(url.to_string()));
        }
        *self.selected.write() = Some(url.to_string());
        Ok(())
    }

    pub fn clear_selection(&self) {
        *self.selected.write() = None;
    }

    pub fn selected(&self) -> Option<String> {
        self.selected.read().clone()
    }

    /// computed on every call so it always reflects the current selection
    pub fn endpoints(&self) -> Vec<Url> {
        let selected = self.selected.read().clone();

        let mut seen = BTreeSet::new();
        self.defaults
            .iter()
            .chain(selected.iter())
            .chain(self.presets.iter())
            .filter_map(|raw| match normalize_url(raw) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") => Some(url),
                _ => {
                    log::warn!("ignoring invalid relay url '{}'", raw);
                    None
                }
            })
            .filter(|url| seen.insert(url.to_string()))
            .collect()
    }
}
