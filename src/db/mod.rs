pub mod models;
pub mod store;

pub use models::SignalRecord;
pub use store::{SignalStore, HISTORY_LIMIT};
