pub mod build;
pub mod priority;
pub mod sanitize;
pub mod set;
pub mod symbology;
pub mod sync;

pub use build::*;
pub use priority::*;
pub use sanitize::*;
pub use set::*;
pub use symbology::*;
pub use sync::*;
