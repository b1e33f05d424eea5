pub mod add;
pub mod common;
pub mod delete;
pub mod list;
pub mod pending;
pub mod sync;
pub mod watch;
