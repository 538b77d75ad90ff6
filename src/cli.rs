use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "moltmint")]
#[command(version, about = "Automated molt-20 token agents for the Moltbook network", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the continuous auto-mint loop
    AutoMint,

    /// Link the configured wallet for every bot account
    LinkWallet,

    /// Interactively transfer tokens from one bot to another account
    Transfer,

    /// Write a default configuration file
    Init {
        /// Where to write the config (defaults to moltmint.toml)
        path: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_auto_mint_command() {
        let args = vec!["moltmint", "auto-mint"];
        let cli = Cli::try_parse_from(args);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(matches!(cli.command, Commands::AutoMint));
    }

    #[test]
    fn test_cli_parses_link_wallet_command() {
        let args = vec!["moltmint", "link-wallet"];
        let cli = Cli::try_parse_from(args);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(matches!(cli.command, Commands::LinkWallet));
    }

    #[test]
    fn test_cli_parses_init_command() {
        let args = vec!["moltmint", "init", "custom.toml"];
        let cli = Cli::try_parse_from(args);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        match cli.command {
            Commands::Init { path } => {
                assert_eq!(path, Some(PathBuf::from("custom.toml")));
            }
            other => panic!("expected Init, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_config_option() {
        let args = vec!["moltmint", "--config", "fleet.toml", "transfer"];
        let cli = Cli::try_parse_from(args);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(cli.config.is_some());
        assert_eq!(cli.config.unwrap(), PathBuf::from("fleet.toml"));
    }

    #[test]
    fn test_cli_all_commands_parse() {
        let commands = vec![
            vec!["moltmint", "auto-mint"],
            vec!["moltmint", "link-wallet"],
            vec!["moltmint", "transfer"],
            vec!["moltmint", "init"],
        ];

        for args in commands {
            let cli = Cli::try_parse_from(args.clone());
            assert!(cli.is_ok(), "Failed to parse: {:?}", args);
        }
    }
}
