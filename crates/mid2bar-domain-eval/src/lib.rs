pub mod aligner;
pub mod counts;
pub mod layout;
pub mod pitch_log;
pub mod scoring;

pub use aligner::*;
pub use counts::*;
pub use layout::*;
pub use pitch_log::*;
pub use scoring::*;
