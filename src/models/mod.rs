pub mod event;
pub mod names;
pub mod report;
pub mod swap;
pub mod template;

pub use event::{Conclusion, Event, EventPhase, SignupOutcome, MAX_SLOTS};
pub use names::MAX_NAME_LEN;
pub use report::{format_amount, parse_amount, Report};
pub use swap::SwapProposal;
pub use template::{template_key, Template};

