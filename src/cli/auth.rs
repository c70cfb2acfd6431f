use crate::config::{AuthMode, Settings};
use crate::error::Result;
use crate::export::Exporter;
use crate::sheets::InteractiveAuthorizer;
use tracing::info;
use yup_oauth2::ApplicationSecret;

pub(super) fn authorizer(
    secret: &ApplicationSecret,
    mode: AuthMode,
) -> Result<InteractiveAuthorizer> {
    match mode {
        AuthMode::Console => InteractiveAuthorizer::stdin(secret),
        AuthMode::Loopback { port } => InteractiveAuthorizer::loopback(secret, port),
    }
}

pub(super) async fn execute(settings: Settings, reset: bool) -> Result<()> {
    let auth_mode = settings.auth_mode;
    let exporter = Exporter::new(settings);

    if reset {
        exporter.token_cache().clear()?;
    }

    let _token = exporter
        .authenticate(|secret| authorizer(secret, auth_mode))
        .await?;

    info!(path = ?exporter.token_cache().path(), "Google authentication verified");

    Ok(())
}
