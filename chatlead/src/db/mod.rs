pub mod backends;
mod connection;
pub mod repository;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::{ConnectionSource, LibSqlBackend, LibSqlTransaction};
pub use connection::Database;
pub use traits::*;
