//! Security checks applied to every entry.

pub mod filter;
pub mod guard;
pub mod names;
pub mod quota;

pub use filter::PatternFilter;
pub use guard::PathGuard;
pub use names::check_entry_name;
pub use names::check_output_name;
pub use quota::QuotaTracker;
