pub mod feature;
pub mod geojson;

pub use feature::*;
pub use geojson::*;
