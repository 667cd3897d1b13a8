pub mod error;
pub mod fetch;
pub mod source;
pub mod viewport;

pub use error::*;
pub use fetch::*;
pub use source::*;
pub use viewport::*;
