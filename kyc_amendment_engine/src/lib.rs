//! Amendment engine (C9, spec.md §4.5): the named-mutation registry plus
//! the load -> mutate -> validate -> persist orchestration used by both
//! the gRPC facade and the CLI.

pub mod cancel;
pub mod engine;
pub mod error;
pub mod mutations;
pub mod registry;

pub use cancel::CancelToken;
pub use engine::AmendmentEngine;
pub use error::AmendmentError;
