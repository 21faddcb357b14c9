pub mod amounts;
pub mod classify;
pub mod dates;
pub mod engine;
pub mod error;
pub mod layout;
pub mod models;
pub mod profile;
pub mod reconcile;
pub mod skip;
