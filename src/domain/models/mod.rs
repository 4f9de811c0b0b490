mod conversation;
mod device;
mod error;
mod generation;
mod init_progress;
mod slash_commands;
mod store;

pub use conversation::*;
pub use device::*;
pub use error::*;
pub use generation::*;
pub use init_progress::*;
pub use slash_commands::*;
pub use store::*;
