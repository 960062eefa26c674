//! Gateway server and the shared state injected into every handler.

pub mod server;
pub mod state;

pub use server::GatewayServer;
pub use state::GatewayState;
