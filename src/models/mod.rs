pub mod log_entry;
pub mod order;
pub mod platform;
pub mod store;
