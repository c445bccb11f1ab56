//! SQLite-backed storage for Tiller runs.
//!
//! Every run's transcript — user message, assistant turns, tool calls and
//! their results — is recorded as an append-only event log, queryable by run
//! id. This is what makes `tiller runs` and `tiller logs` work after the
//! process exits.
//!
//! # Example
//!
//! ```no_run
//! use storage::{Event, EventKind, Role, RunId, RunStore};
//!
//! let store = RunStore::open("runs.db")?;
//!
//! let run_id = RunId::new();
//! store.append(&Event::new(run_id, EventKind::RunStart {
//!     prompt: "What is 2+2?".into(),
//! }))?;
//! store.append(&Event::message(run_id, Role::Assistant, "4"))?;
//! store.append(&Event::new(run_id, EventKind::RunEnd))?;
//!
//! for event in store.load_run(run_id)? {
//!     println!("{}: {:?}", event.timestamp, event.kind);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, Role, RunId};
pub use store::{RunStore, RunSummary};
