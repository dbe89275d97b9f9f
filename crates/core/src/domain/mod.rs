pub mod contract;
pub mod history;
pub mod regime;
pub mod signal;
pub mod snapshot;
