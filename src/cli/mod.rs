mod auth;
mod export;
mod show;

use crate::config::{Config, Overrides, Settings};
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "gsheet-export")]
#[command(about = "Export a Google Sheets range to CSV", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let settings = self.settings.resolve()?;

        match &self.command {
            None | Some(Commands::Export) => export::execute(settings).await,
            Some(Commands::Auth { reset }) => auth::execute(settings, *reset).await,
            Some(Commands::Show { resource }) => resource.execute(&settings).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the range, print it and write it to CSV (default)
    Export,
    /// Obtain and cache an OAuth token without fetching anything
    Auth {
        /// Delete the cached token first
        #[arg(long)]
        reset: bool,
    },
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}

#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// OAuth client secret JSON downloaded from the Google Cloud console
    #[arg(long, global = true)]
    pub client_secret: Option<PathBuf>,

    /// Directory holding the cached token [default: ~/.credentials]
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// CSV file to write
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    #[arg(long, global = true)]
    pub spreadsheet_id: Option<String>,

    /// Cell range in A1 notation
    #[arg(long, global = true)]
    pub range: Option<String>,

    /// Receive the authorization redirect on this local port instead of
    /// pasting the code
    #[arg(long, global = true, value_name = "PORT")]
    pub listen: Option<u16>,
}

impl SettingsArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            client_secret: self.client_secret.clone(),
            cache_dir: self.cache_dir.clone(),
            output: self.output.clone(),
            spreadsheet_id: self.spreadsheet_id.clone(),
            range: self.range.clone(),
            listen: self.listen,
        }
    }

    fn resolve(&self) -> Result<Settings> {
        Settings::resolve(self.overrides(), Config::load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_export() {
        let cli = Cli::try_parse_from(["gsheet-export"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gsheet-export",
            "auth",
            "--reset",
            "--cache-dir",
            "/tmp/creds",
            "--listen",
            "8085",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Auth { reset: true })));
        let overrides = cli.settings.overrides();
        assert_eq!(overrides.cache_dir, Some(PathBuf::from("/tmp/creds")));
        assert_eq!(overrides.listen, Some(8085));
    }

    #[test]
    fn test_export_flags() {
        let cli = Cli::try_parse_from([
            "gsheet-export",
            "export",
            "--spreadsheet-id",
            "sheet_123",
            "--range",
            "Sheet1!A1:B2",
            "--output",
            "out.csv",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Export)));
        let overrides = cli.settings.overrides();
        assert_eq!(overrides.spreadsheet_id.as_deref(), Some("sheet_123"));
        assert_eq!(overrides.range.as_deref(), Some("Sheet1!A1:B2"));
        assert_eq!(overrides.output, Some(PathBuf::from("out.csv")));
    }
}
