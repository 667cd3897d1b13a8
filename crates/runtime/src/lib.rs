pub mod budget;
pub mod cancel;
pub mod debounce;
pub mod event_bus;
pub mod frame;

pub use budget::*;
pub use cancel::*;
pub use debounce::*;
pub use event_bus::*;
pub use frame::*;
