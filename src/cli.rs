use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grabbox")]
#[command(about = "Queue media URLs and extract their audio with yt-dlp", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $GRABBOX_CONFIG or config/grabbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the web UI and HTTP API
    Server(ServerArgs),
    /// Download the given URLs and exit once all of them settle
    Fetch(FetchArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// URLs to download
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Worker slots for this run (overrides workers.max_workers)
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from(["grabbox", "--config", "my.toml", "fetch", "-j", "2", "https://a", "https://b"]);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.urls, vec!["https://a", "https://b"]);
                assert_eq!(args.workers, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_fetch_zero_workers() {
        // Zero parses here; the fetch command swaps it for the default
        let cli = Cli::parse_from(["grabbox", "fetch", "-j", "0", "https://a"]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.workers, Some(0));
                let count = grabbox::config::WorkerCount::or_default(args.workers.unwrap());
                assert_eq!(count.get(), grabbox::config::WorkerCount::DEFAULT);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_server_address() {
        let cli = Cli::parse_from(["grabbox", "server", "--address", "0.0.0.0:8000"]);
        assert!(matches!(
            cli.command,
            Commands::Server(ServerArgs { address: Some(addr) }) if addr.port() == 8000
        ));
    }
}
