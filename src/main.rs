use anyhow::Result;
use env_logger::Env;

mod builtins;
mod config;
mod error;
mod executor;
mod handlers;
mod platform;
mod server;

use config::Config;
use server::Server;

fn main() -> Result<()> {
    // No CLI flags: everything comes from the environment (PORT, HOST, TERMBRIDGE_*).
    env_logger::Builder::from_env(Env::default().filter_or("TERMBRIDGE_LOG", "info")).init();
    let config = Config::from_env()?;
    Server::new(config).run()
}
