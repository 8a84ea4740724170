extern crate log;
extern crate pretty_env_logger;

mod account;
mod api;
mod demo;
mod host;
mod records;
mod states;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "relationship messaging portal backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// host the privileged clear-messages endpoint
    Serve(api::ServeArgs),
    /// run the mutual-consent clear protocol end to end
    Demo(demo::run::DemoArgs),
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Cli::parse().command {
        Command::Serve(args) => api::serve(args),
        Command::Demo(args) => demo::run::run_demo(args),
    }
}
