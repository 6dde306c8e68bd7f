pub mod connection;
pub mod dispatcher;

pub use dispatcher::{ConnectionHandle, Dispatcher, Notifier};
