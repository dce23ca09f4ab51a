use std::path::PathBuf;

use cardex::JobStatus;
use clap::{ArgAction, Args, Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "cardex.json";
pub const DEFAULT_URL_TTL_SECS: u64 = 900;

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "cardex",
    version,
    about = "Store business card photos and extract their contact data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Path to the JSON configuration file.
    #[arg(global = true, short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Increase logging verbosity (-v, -vv). Ignored when RUST_LOG is set.
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload one or two card images and run extraction.
    Submit(SubmitArgs),
    /// Re-run extraction for a failed card.
    Retry(IdArgs),
    /// Print a stored card.
    Get(GetArgs),
    /// List stored cards, optionally filtered by status.
    List(ListArgs),
    /// Replace the free-text observation of a card.
    Observe(ObserveArgs),
    /// Print time-limited read URLs for the images of a card.
    Urls(UrlsArgs),
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Image files, front side first.
    #[arg(required = true, num_args = 1..=2, value_name = "IMAGE")]
    pub files: Vec<PathBuf>,
    /// Free-text note stored with the card.
    #[arg(long, default_value = "")]
    pub observation: String,
    /// Who submitted the card.
    #[arg(long, default_value = "")]
    pub user: String,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    pub id: String,
    /// Include base64 image bytes in the output.
    #[arg(long)]
    pub images: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// One of pending, processing, completed, failed, retrying.
    #[arg(long)]
    pub status: Option<JobStatus>,
}

#[derive(Debug, Args)]
pub struct ObserveArgs {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Args)]
pub struct UrlsArgs {
    pub id: String,
    /// Lifetime of each URL in seconds.
    #[arg(long = "ttl-secs", default_value_t = DEFAULT_URL_TTL_SECS)]
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from([
            "cardex",
            "submit",
            "front.jpg",
            "back.png",
            "--observation",
            "met at expo",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.observation, "met at expo");
                assert_eq!(args.user, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_submit_rejects_three_files() {
        let result = Cli::try_parse_from(["cardex", "submit", "a.jpg", "b.jpg", "c.jpg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_list_status() {
        let cli = Cli::try_parse_from(["cardex", "list", "--status", "failed"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.status, Some(JobStatus::Failed)),
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["cardex", "list", "--status", "lost"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cardex", "urls", "abc", "-c", "/etc/cardex.json", "-vv"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/cardex.json"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Urls(args) => assert_eq!(args.ttl_secs, DEFAULT_URL_TTL_SECS),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
