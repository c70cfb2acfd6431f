use super::auth::authorizer;
use crate::config::Settings;
use crate::error::Result;
use crate::export::Exporter;
use crate::sheets::SheetsClient;
use tracing::info;

pub(super) async fn execute(settings: Settings) -> Result<()> {
    let auth_mode = settings.auth_mode;
    let exporter = Exporter::new(settings);
    let mut stdout = std::io::stdout();

    let summary = exporter
        .run(
            |secret| authorizer(secret, auth_mode),
            SheetsClient::new,
            &mut stdout,
        )
        .await?;

    info!(rows = summary.rows, path = ?summary.output, "Export completed");

    Ok(())
}
