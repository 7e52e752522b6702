use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, grid::Grid, routing::RouteCosts};

/// Editor tunables. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub unit_px: i32,
    pub move_cost: u32,
    pub turn_penalty: u32,
    /// Thickness of the blocked ring around every module, in cells.
    pub module_padding: i32,
    pub wiring_toggle_clears_selection: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            unit_px: Grid::DEFAULT_UNIT_PX,
            move_cost: 1,
            turn_penalty: 50,
            module_padding: 1,
            wiring_toggle_clears_selection: true,
        }
    }
}

impl EditorConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.unit_px)
    }

    pub fn route_costs(&self) -> RouteCosts {
        RouteCosts {
            move_cost: self.move_cost,
            turn_penalty: self.turn_penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EditorConfig::from_ron_str("(unit_px: 16, turn_penalty: 10)").unwrap();
        assert_eq!(config.unit_px, 16);
        assert_eq!(config.turn_penalty, 10);
        assert_eq!(config.move_cost, 1);
        assert_eq!(config.module_padding, 1);
        assert_eq!(config.grid().unit_px(), 16);
    }

    #[test]
    fn empty_struct_is_default() {
        assert_eq!(EditorConfig::from_ron_str("()").unwrap(), EditorConfig::default());
    }

    #[test]
    fn bad_config_is_an_error() {
        assert!(matches!(
            EditorConfig::from_ron_str("(unit_px: \"big\")"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EditorConfig::load("/definitely/not/here.ron"),
            Err(ConfigError::Io(_))
        ));
    }
}
