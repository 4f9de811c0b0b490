mod callback_registry;
mod device_probe;
mod init_progress_tracker;
mod session_controller;
mod worker_proxy;

pub use callback_registry::*;
pub use device_probe::*;
pub use init_progress_tracker::*;
pub use session_controller::*;
pub use worker_proxy::*;
