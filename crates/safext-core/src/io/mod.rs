//! Stream wrappers used by the extraction pipeline.

pub mod limited;
pub mod peek;
pub mod spool;

pub use limited::ByteMeter;
pub use limited::LimitedReader;
pub use limited::LimitedWriter;
pub use peek::PeekReader;
pub use spool::Spool;
