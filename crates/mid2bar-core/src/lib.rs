pub mod app;
pub mod capture_queue;
pub mod clock;
pub mod ipc;
pub mod pacer;
pub mod pitch_analysis;
pub mod pitch_detector;

pub use app::*;
pub use capture_queue::*;
pub use clock::*;
pub use ipc::*;
pub use pacer::*;
pub use pitch_analysis::*;
pub use pitch_detector::*;
