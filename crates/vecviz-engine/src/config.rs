//! Editor configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use vecviz_history::HistoryConfig;

/// Settings supplied by the host when an [`Editor`](crate::Editor) is built.
///
/// # Example
///
/// ```
/// use vecviz_engine::EditorConfig;
///
/// let config = EditorConfig::default()
///     .with_history_limit(20)
///     .with_random_colors(true);
/// assert_eq!(config.history.max_entries, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo log settings.
    pub history: HistoryConfig,
    /// Give new nodes a random colour instead of `default_color`.
    pub random_colors: bool,
    /// RGB colour of new nodes, each channel in `0.0..=1.0`.
    pub default_color: [f32; 3],
    /// Remove a node's outgoing connections when its calculation fails.
    pub prune_on_calculation_error: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            random_colors: false,
            default_color: [0.2, 0.6, 1.0],
            prune_on_calculation_error: true,
        }
    }
}

impl EditorConfig {
    /// Sets the undo limit (0 = unlimited).
    pub fn with_history_limit(mut self, max_entries: usize) -> Self {
        self.history = HistoryConfig::with_limit(max_entries);
        self
    }

    /// Enables or disables random node colours.
    pub fn with_random_colors(mut self, enabled: bool) -> Self {
        self.random_colors = enabled;
        self
    }

    /// Sets the colour of new nodes.
    pub fn with_default_color(mut self, color: [f32; 3]) -> Self {
        self.default_color = color;
        self
    }

    /// Enables or disables pruning after a calculation error.
    pub fn with_prune_on_calculation_error(mut self, enabled: bool) -> Self {
        self.prune_on_calculation_error = enabled;
        self
    }

    /// Colour for a newly created node.
    pub fn node_color(&self) -> [f32; 3] {
        if self.random_colors {
            let mut rng = rand::thread_rng();
            [rng.gen(), rng.gen(), rng.gen()]
        } else {
            self.default_color
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history.max_entries, 100);
        assert!(config.prune_on_calculation_error);
        assert_eq!(config.node_color(), config.default_color);
    }

    #[test]
    fn test_random_colors_in_range() {
        let config = EditorConfig::default().with_random_colors(true);
        for _ in 0..20 {
            assert!(config
                .node_color()
                .iter()
                .all(|channel| (0.0..=1.0).contains(channel)));
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"random_colors": true, "history": {"max_entries": 0}}"#)
                .unwrap();
        assert!(config.random_colors);
        assert_eq!(config.history, HistoryConfig::unlimited());
        assert!(config.prune_on_calculation_error);
    }
}
