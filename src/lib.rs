//! Client-side board engine for a task tracker.
//!
//! Keeps an ordered, status-partitioned item collection consistent with a
//! remote store under drag reordering, optimistic mutations with
//! rollback, a time-windowed undo stack, and an archive lifecycle. The
//! surrounding application — routing, auth, rendering, persistence — is
//! an external collaborator reached only through the request/response
//! contracts in [`remote::api`].
//!
//! The flow: a gesture is resolved by [`ops::drag`] or a direct
//! [`coordinator::Coordinator`] entry point; the coordinator applies it
//! to the [`model::Board`] immediately, registers a reversible action
//! with the [`undo::UndoManager`], and hands the host an
//! [`coordinator::Outbound`] to carry to the store; the host settles the
//! ticket with the outcome, and a rejection rolls everything back.

pub mod coordinator;
pub mod io;
pub mod model;
pub mod ops;
pub mod remote;
pub mod undo;

pub use coordinator::{
    ArchiveOptions, ArchiveOutcome, Coordinator, CoordinatorError, Outbound, SettleOutcome, Ticket,
};
pub use model::{
    ArchiveBucket, ArchivedItem, Board, BoardError, BuiltinStatus, CustomStatus, EngineConfig,
    Item, ItemSnapshot, Partition, Priority,
};
pub use ops::drag::{DragResolution, DropCandidate, DropTarget};
pub use remote::{MemoryRemote, RemoteError, RemoteRequest, RemoteResult};
pub use undo::{ActionState, UndoEvent, UndoManager};
