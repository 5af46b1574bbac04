mod chat;
mod common;
mod contact;
mod import;
mod message;
mod score;

pub use chat::*;
pub use common::*;
pub use contact::*;
pub use import::*;
pub use message::*;
pub use score::*;
