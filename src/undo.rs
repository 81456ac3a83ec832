use chrono::{DateTime, Duration, Utc};

use crate::model::config::UndoConfig;
use crate::ops::mutation::Mutation;

/// Lifecycle of a reversible action. Both Undone and Expired are
/// terminal — an undone action never becomes undoable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Active,
    Undone,
    Expired,
}

/// A reversible action registered for one applied mutation.
/// The stored mutation is the forward payload; the backward effect is its
/// inverse, applied through the coordinator.
#[derive(Debug, Clone)]
pub struct UndoAction {
    pub id: u64,
    pub mutation: Mutation,
    /// Short human label for the toast ("Priority changed", …)
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub state: ActionState,
    /// Whether the toast-elapsed event has been emitted
    toast_notified: bool,
}

impl UndoAction {
    pub fn affected_ids(&self) -> Vec<String> {
        self.mutation.affected_ids()
    }
}

/// Events surfaced to the display layer by `poll`. The display only ever
/// learns "the toast is done" and "the action expired" — there are no
/// timer callbacks to cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEvent {
    /// The short toast affordance window elapsed; the action stays
    /// undoable for the rest of the full window via shortcut
    ToastElapsed { action_id: u64 },
    /// The full undo window elapsed; the action can no longer be undone
    Expired { action_id: u64 },
}

/// Error type for undo operations
#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("undo action not found: {0}")]
    NotFound(u64),
    #[error("action already undone: {0}")]
    AlreadyUndone(u64),
    #[error("undo window elapsed for action {0}")]
    Expired(u64),
}

/// The time-windowed stack of reversible actions.
///
/// Single-owner: `claim`/`claim_latest` transition an action to Undone
/// before any effect runs, so two rapid invocations (toast click racing a
/// keyboard shortcut) cannot both act on the same action.
pub struct UndoManager {
    actions: Vec<UndoAction>,
    next_id: u64,
    window: Duration,
    toast_window: Duration,
    stack_limit: usize,
}

impl UndoManager {
    pub fn new(config: &UndoConfig) -> Self {
        UndoManager {
            actions: Vec::new(),
            next_id: 1,
            window: Duration::seconds(config.window_secs),
            toast_window: Duration::seconds(config.toast_secs),
            stack_limit: config.stack_limit,
        }
    }

    /// Register a freshly applied mutation. Returns the action ID.
    /// The oldest actions fall off beyond the stack limit.
    pub fn add_action(
        &mut self,
        mutation: Mutation,
        label: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.actions.push(UndoAction {
            id,
            mutation,
            label: label.into(),
            created_at: now,
            state: ActionState::Active,
            toast_notified: false,
        });
        if self.actions.len() > self.stack_limit {
            let excess = self.actions.len() - self.stack_limit;
            self.actions.drain(..excess);
        }
        id
    }

    pub fn get(&self, id: u64) -> Option<&UndoAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Actions still inside their window, oldest first
    pub fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = &UndoAction> {
        self.actions
            .iter()
            .filter(move |a| a.state == ActionState::Active && !self.is_past_window(a, now))
    }

    /// Claim an action for undo: if it is Active and inside its window,
    /// transition it to Undone and hand back the mutation to invert.
    /// Fails without side effects otherwise.
    pub fn claim(&mut self, id: u64, now: DateTime<Utc>) -> Result<Mutation, UndoError> {
        let window = self.window;
        let action = self
            .actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(UndoError::NotFound(id))?;
        match action.state {
            ActionState::Undone => Err(UndoError::AlreadyUndone(id)),
            ActionState::Expired => Err(UndoError::Expired(id)),
            ActionState::Active => {
                if now - action.created_at > window {
                    action.state = ActionState::Expired;
                    return Err(UndoError::Expired(id));
                }
                action.state = ActionState::Undone;
                Ok(action.mutation.clone())
            }
        }
    }

    /// Claim the most recently added Active action across the whole
    /// stack, regardless of which item it touched.
    pub fn claim_latest(&mut self, now: DateTime<Utc>) -> Result<(u64, Mutation), UndoError> {
        let id = self
            .actions
            .iter()
            .rev()
            .find(|a| a.state == ActionState::Active && !self.is_past_window(a, now))
            .map(|a| a.id)
            .ok_or(UndoError::NothingToUndo)?;
        let mutation = self.claim(id, now)?;
        Ok((id, mutation))
    }

    /// Mutable access to an action's stored mutation, for the coordinator
    /// to rewrite chained rollback targets
    pub(crate) fn action_mutation_mut(&mut self, id: u64) -> Option<&mut Mutation> {
        self.actions
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| &mut a.mutation)
    }

    /// Drop an action whose mutation never committed (rolled back after a
    /// remote rejection). Its deadlines are cancelled with it.
    /// Returns true when an Active action was removed.
    pub fn discard(&mut self, id: u64) -> bool {
        let before = self.actions.len();
        self.actions
            .retain(|a| !(a.id == id && a.state == ActionState::Active));
        if self.actions.len() != before {
            log::debug!("discarded undo action {} for an uncommitted mutation", id);
            true
        } else {
            false
        }
    }

    /// Advance time: emit toast-elapsed events and expire actions whose
    /// window has passed. Call from the host's tick.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<UndoEvent> {
        let mut events = Vec::new();
        let window = self.window;
        let toast_window = self.toast_window;
        for action in &mut self.actions {
            if action.state != ActionState::Active {
                continue;
            }
            let age = now - action.created_at;
            if age > window {
                action.state = ActionState::Expired;
                // An expired toast never fired its elapsed event; the
                // display tears the toast down on Expired either way
                action.toast_notified = true;
                events.push(UndoEvent::Expired {
                    action_id: action.id,
                });
            } else if age > toast_window && !action.toast_notified {
                action.toast_notified = true;
                events.push(UndoEvent::ToastElapsed {
                    action_id: action.id,
                });
            }
        }
        events
    }

    fn is_past_window(&self, action: &UndoAction, now: DateTime<Utc>) -> bool {
        now - action.created_at > self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Priority;
    use crate::ops::mutation::{FieldDelta, ItemChange};
    use chrono::TimeZone;

    fn config() -> UndoConfig {
        UndoConfig::default()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_mutation(id: &str) -> Mutation {
        Mutation::Update {
            changes: vec![ItemChange {
                id: id.into(),
                deltas: vec![FieldDelta::Priority {
                    old: Priority::Medium,
                    new: Priority::High,
                }],
            }],
        }
    }

    #[test]
    fn test_claim_transitions_to_undone_and_guards_double_invocation() {
        let mut mgr = UndoManager::new(&config());
        let id = mgr.add_action(sample_mutation("a"), "Priority changed", t0());

        assert!(mgr.claim(id, t0() + Duration::seconds(2)).is_ok());
        assert_eq!(mgr.get(id).unwrap().state, ActionState::Undone);

        // Racing second invocation fails without side effects
        let err = mgr.claim(id, t0() + Duration::seconds(2)).unwrap_err();
        assert!(matches!(err, UndoError::AlreadyUndone(_)));
    }

    #[test]
    fn test_claim_past_window_expires() {
        let mut mgr = UndoManager::new(&config());
        let id = mgr.add_action(sample_mutation("a"), "Priority changed", t0());

        let err = mgr.claim(id, t0() + Duration::seconds(31)).unwrap_err();
        assert!(matches!(err, UndoError::Expired(_)));
        assert_eq!(mgr.get(id).unwrap().state, ActionState::Expired);
    }

    #[test]
    fn test_action_undoable_after_toast_but_inside_window() {
        let mut mgr = UndoManager::new(&config());
        let id = mgr.add_action(sample_mutation("a"), "Priority changed", t0());

        // Toast gone at 5s, still undoable at 20s
        let events = mgr.poll(t0() + Duration::seconds(6));
        assert_eq!(events, vec![UndoEvent::ToastElapsed { action_id: id }]);
        assert!(mgr.claim(id, t0() + Duration::seconds(20)).is_ok());
    }

    #[test]
    fn test_claim_latest_takes_most_recent_across_items() {
        let mut mgr = UndoManager::new(&config());
        let _a = mgr.add_action(sample_mutation("a"), "A", t0());
        let b = mgr.add_action(sample_mutation("b"), "B", t0() + Duration::seconds(1));
        let c = mgr.add_action(sample_mutation("c"), "C", t0() + Duration::seconds(2));

        let (id, _) = mgr.claim_latest(t0() + Duration::seconds(3)).unwrap();
        assert_eq!(id, c);

        // Undone actions are skipped on the next claim
        let (id, _) = mgr.claim_latest(t0() + Duration::seconds(4)).unwrap();
        assert_eq!(id, b);
    }

    #[test]
    fn test_claim_latest_with_nothing_active_fails() {
        let mut mgr = UndoManager::new(&config());
        let err = mgr.claim_latest(t0()).unwrap_err();
        assert!(matches!(err, UndoError::NothingToUndo));
    }

    #[test]
    fn test_poll_expires_and_reports_once() {
        let mut mgr = UndoManager::new(&config());
        let id = mgr.add_action(sample_mutation("a"), "A", t0());

        let events = mgr.poll(t0() + Duration::seconds(31));
        assert_eq!(events, vec![UndoEvent::Expired { action_id: id }]);
        // Terminal — nothing further
        assert!(mgr.poll(t0() + Duration::seconds(60)).is_empty());
    }

    #[test]
    fn test_discard_cancels_action() {
        let mut mgr = UndoManager::new(&config());
        let id = mgr.add_action(sample_mutation("a"), "A", t0());
        assert!(mgr.discard(id));
        assert!(mgr.get(id).is_none());
        assert!(!mgr.discard(id));
    }

    #[test]
    fn test_stack_limit_evicts_oldest() {
        let mut mgr = UndoManager::new(&UndoConfig {
            stack_limit: 2,
            ..UndoConfig::default()
        });
        let a = mgr.add_action(sample_mutation("a"), "A", t0());
        let b = mgr.add_action(sample_mutation("b"), "B", t0());
        let c = mgr.add_action(sample_mutation("c"), "C", t0());

        assert!(mgr.get(a).is_none());
        assert!(mgr.get(b).is_some());
        assert!(mgr.get(c).is_some());
    }
}
