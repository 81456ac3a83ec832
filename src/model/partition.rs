use serde::{Deserialize, Serialize};

use super::item::BuiltinStatus;
use super::status::CustomStatus;

/// The partition (lane) an item belongs to — exactly one of the two kinds.
/// Setting one kind replaces the other by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Partition {
    Builtin(BuiltinStatus),
    Custom(String),
}

impl Partition {
    pub fn as_builtin(&self) -> Option<BuiltinStatus> {
        match self {
            Partition::Builtin(s) => Some(*s),
            Partition::Custom(_) => None,
        }
    }

    pub fn as_custom(&self) -> Option<&str> {
        match self {
            Partition::Builtin(_) => None,
            Partition::Custom(id) => Some(id.as_str()),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Builtin(s) => write!(f, "{}", s.label()),
            Partition::Custom(id) => write!(f, "custom:{}", id),
        }
    }
}

/// Display rank of a built-in lane: In Progress, Waiting, Complete
fn builtin_rank(status: BuiltinStatus) -> u8 {
    match status {
        BuiltinStatus::InProgress => 0,
        BuiltinStatus::Wait => 1,
        BuiltinStatus::Complete => 2,
    }
}

/// Canonical lane display order: the built-in lanes first, then custom
/// lanes by their position field ascending.
pub fn canonical_partitions(statuses: &[CustomStatus]) -> Vec<Partition> {
    let mut out = vec![
        Partition::Builtin(BuiltinStatus::InProgress),
        Partition::Builtin(BuiltinStatus::Wait),
        Partition::Builtin(BuiltinStatus::Complete),
    ];
    let mut customs: Vec<&CustomStatus> = statuses.iter().collect();
    customs.sort_by_key(|s| s.position);
    out.extend(customs.into_iter().map(|s| Partition::Custom(s.id.clone())));
    out
}

/// Sort key for flattening items across lanes in display order.
/// Custom lanes rank after every built-in lane; an unknown custom ID
/// sorts last.
pub fn partition_rank(partition: &Partition, statuses: &[CustomStatus]) -> (u8, i64) {
    match partition {
        Partition::Builtin(s) => (0, builtin_rank(*s) as i64),
        Partition::Custom(id) => {
            let pos = statuses
                .iter()
                .find(|s| s.id == *id)
                .map(|s| s.position)
                .unwrap_or(i64::MAX);
            (1, pos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_statuses() -> Vec<CustomStatus> {
        vec![
            CustomStatus {
                id: "cs-review".into(),
                name: "Review".into(),
                color: "#7e57c2".into(),
                position: 1,
            },
            CustomStatus {
                id: "cs-someday".into(),
                name: "Someday".into(),
                color: "#90a4ae".into(),
                position: 0,
            },
        ]
    }

    #[test]
    fn test_canonical_order_builtins_then_customs_by_position() {
        let order = canonical_partitions(&sample_statuses());
        assert_eq!(
            order,
            vec![
                Partition::Builtin(BuiltinStatus::InProgress),
                Partition::Builtin(BuiltinStatus::Wait),
                Partition::Builtin(BuiltinStatus::Complete),
                Partition::Custom("cs-someday".into()),
                Partition::Custom("cs-review".into()),
            ]
        );
    }

    #[test]
    fn test_partition_is_exactly_one_kind() {
        let builtin = Partition::Builtin(BuiltinStatus::Wait);
        assert!(builtin.as_builtin().is_some());
        assert!(builtin.as_custom().is_none());

        let custom = Partition::Custom("cs-review".into());
        assert!(custom.as_builtin().is_none());
        assert!(custom.as_custom().is_some());
    }

    #[test]
    fn test_rank_orders_customs_after_builtins() {
        let statuses = sample_statuses();
        let complete = partition_rank(&Partition::Builtin(BuiltinStatus::Complete), &statuses);
        let someday = partition_rank(&Partition::Custom("cs-someday".into()), &statuses);
        let unknown = partition_rank(&Partition::Custom("cs-gone".into()), &statuses);
        assert!(complete < someday);
        assert!(someday < unknown);
    }
}
