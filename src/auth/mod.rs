pub mod account_directory;
pub mod handler;

pub use account_directory::*;
pub use handler::*;
