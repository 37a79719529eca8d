pub mod driver;
pub mod paths;
pub mod resolver;
pub mod state;
pub mod transfer;
