use crate::config::{Config, Settings};
use crate::error::Result;
use crate::export::Exporter;
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show configuration, credential and output paths
    Paths,
}

impl ShowResource {
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(settings),
        }
    }
}

fn show_paths(settings: &Settings) -> Result<()> {
    let config_path = Config::config_file()?;
    let token_cache = Exporter::new(settings.clone()).token_cache();

    info!(path = ?config_path, "Config path");
    info!(path = ?settings.client_secret, "Client secret path");
    info!(path = ?token_cache.path(), "Token cache path");
    info!(path = ?settings.output, "Output path");

    Ok(())
}
