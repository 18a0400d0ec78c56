pub mod lyrics;
pub mod midi_import;
pub mod model;
pub mod pages;
pub mod tempo_map;
pub mod timeline;

pub use lyrics::*;
pub use midi_import::*;
pub use model::*;
pub use pages::*;
pub use tempo_map::*;
pub use timeline::*;
