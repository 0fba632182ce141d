pub mod event;
pub mod general;
pub mod template;

pub use event::create_event;
pub use general::{help, ping};
pub use template::template;
