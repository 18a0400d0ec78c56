pub mod audio;
pub mod backing;
pub mod settings;
pub mod storage;
pub mod tables;
pub mod types;

pub use audio::*;
pub use backing::*;
pub use settings::*;
pub use storage::*;
pub use tables::*;
pub use types::*;
