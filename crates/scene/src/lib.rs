pub mod host;
pub mod interaction;
pub mod memory_host;
pub mod picking;
pub mod registry;
pub mod selection;

pub use host::*;
pub use interaction::*;
pub use memory_host::MemoryHost;
pub use picking::*;
pub use registry::*;
pub use selection::*;
