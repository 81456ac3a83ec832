use serde::{Deserialize, Serialize};

/// A user-defined status lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStatus {
    /// Opaque unique ID
    pub id: String,
    pub name: String,
    /// Display color, e.g. `#7e57c2`
    pub color: String,
    /// Display order among custom lanes
    pub position: i64,
}
