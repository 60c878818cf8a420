pub mod config;
pub mod conversation;
pub mod stt;

pub use config::*;
pub use conversation::*;
pub use stt::*;
