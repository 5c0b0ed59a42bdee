pub mod diff;
pub mod registration;
pub mod store;
