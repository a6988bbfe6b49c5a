pub mod status;
pub mod ws;

pub use status::{health, lobby};
pub use ws::serve_connection;
