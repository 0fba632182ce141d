//! Keep-alive web server
//!
//! Hosting platforms that idle a process without inbound HTTP traffic get
//! pinged on `/`; `/health` and `/logs` help when something looks wrong.

mod keep_alive;

pub use keep_alive::{start_keep_alive_server, KeepAliveState};
