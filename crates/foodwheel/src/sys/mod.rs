pub mod location;
pub mod runtime;
pub mod server;
