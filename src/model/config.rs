use serde::{Deserialize, Serialize};

/// Engine configuration, loadable from engine.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoConfig {
    /// How long an applied mutation stays undoable, in seconds
    #[serde(default = "default_undo_window")]
    pub window_secs: i64,
    /// How long the undo toast affordance stays visible, in seconds.
    /// The action remains undoable for the full window via shortcut.
    #[serde(default = "default_toast_window")]
    pub toast_secs: i64,
    /// Maximum retained actions; the oldest are discarded beyond this
    #[serde(default = "default_stack_limit")]
    pub stack_limit: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        UndoConfig {
            window_secs: default_undo_window(),
            toast_secs: default_toast_window(),
            stack_limit: default_stack_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Page size for archive listings
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            page_size: default_page_size(),
        }
    }
}

fn default_undo_window() -> i64 {
    30
}

fn default_toast_window() -> i64 {
    5
}

fn default_stack_limit() -> usize {
    500
}

fn default_page_size() -> usize {
    50
}
