pub mod auth;
pub mod server;
pub mod types;

pub use server::{GatewayServer, CONFIGURATION_PATH, EXECUTE_PATH};
pub use types::ExecuteResponse;
