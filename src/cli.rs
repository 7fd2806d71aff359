use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "offerbox")]
#[command(about = "Seller runtime for marketplace job offerings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Listen for job events and drive them through their offerings
    Serve(ServeArgs),
    /// Load one offering and report every problem with it
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (defaults to server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Offering name, as found under the offerings directory
    pub offering: String,
}
