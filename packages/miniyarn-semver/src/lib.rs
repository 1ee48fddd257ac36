mod error;
mod extract;
mod range;
mod version;

pub use error::Error;
pub use range::{Comparator, Operator, Range};
pub use version::{Version, VersionRc};

/// Numeric components beyond this many digits are rejected rather than
/// silently overflowing.
pub const MAX_SAFE_COMPONENT_LENGTH: usize = 16;
