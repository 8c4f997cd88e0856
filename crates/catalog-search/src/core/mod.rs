//! Core traits: backends and the sessions they open.

mod backend;
mod session;

pub use backend::{ensure_dialect, Backend, BackendKind};
pub use session::{Session, SessionState};
