pub mod action;
pub mod snapshot;
pub mod state;

pub use action::*;
pub use snapshot::*;
pub use state::*;
