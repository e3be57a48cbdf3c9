pub mod command_executor;
pub mod session;
pub mod vapix;
