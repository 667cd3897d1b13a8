pub mod color;
pub mod geo;
pub mod handles;
pub mod kind;
pub mod properties;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use color::*;
pub use geo::*;
pub use handles::*;
pub use kind::*;
pub use properties::*;
pub use time::*;
