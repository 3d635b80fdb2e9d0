//! Command line arguments for the deck-sync binaries.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deck-sync-server")]
#[command(about = "Serve a slide deck file for live editing")]
pub struct ServerArgs {
    /// Markdown file to serve
    #[arg(default_value = "slides.md")]
    pub file: PathBuf,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "DECK_SYNC_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3030, env = "DECK_SYNC_PORT")]
    pub port: u16,

    /// Disable development mode: no push channel and no file watcher
    #[arg(long)]
    pub no_dev: bool,
}

#[derive(Parser, Debug)]
#[command(name = "deck-sync-client")]
#[command(about = "Headless client for a deck-sync server")]
pub struct ClientArgs {
    /// JSON config file
    #[arg(short, long, env = "DECK_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server URL (overrides the config file)
    #[arg(short, long, env = "DECK_SYNC_SERVER")]
    pub server: Option<String>,

    /// Do not subscribe to the push channel
    #[arg(long)]
    pub no_dev: bool,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Print the current file path and content
    Show,
    /// Print every update pushed by the server
    Tail {
        /// Print full content instead of a summary line
        #[arg(long)]
        full: bool,
    },
    /// Replace the server's content with a local file
    Push {
        /// File whose content is sent
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let args = ServerArgs::parse_from(["deck-sync-server"]);
        assert_eq!(args.file, PathBuf::from("slides.md"));
        assert_eq!(args.port, 3030);
        assert!(!args.no_dev);
    }

    #[test]
    fn test_client_push_command() {
        let args = ClientArgs::parse_from([
            "deck-sync-client",
            "--server",
            "http://localhost:4000",
            "push",
            "draft.md",
        ]);
        assert_eq!(args.server.as_deref(), Some("http://localhost:4000"));
        match args.command {
            ClientCommand::Push { file } => assert_eq!(file, PathBuf::from("draft.md")),
            other => panic!("Expected push, got {:?}", other),
        }
    }
}
