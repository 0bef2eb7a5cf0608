mod hmr;
mod server;
mod state;
mod watch;

pub use hmr::HmrMessage;
pub use server::DevServer;
