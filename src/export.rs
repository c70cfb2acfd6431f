use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::output;
use crate::sheets::{Authorizer, SERVICE_ID, SheetOperations, Token, TokenCache};
use crate::sheets::{acquire_token, load_client_secret};
use indicatif::ProgressStyle;
use std::io::Write;
use std::path::PathBuf;
use tracing::{Span, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::suspend_tracing_indicatif;
use yup_oauth2::ApplicationSecret;

#[derive(Debug, PartialEq)]
pub struct ExportSummary {
    pub rows: usize,
    pub output: PathBuf,
}

/// Runs one export: credentials, token, fetch, print, CSV.
///
/// The authorizer and sheets client are built through the supplied
/// constructors so the flow can run against fakes.
pub struct Exporter {
    settings: Settings,
}

impl Exporter {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn token_cache(&self) -> TokenCache {
        TokenCache::new(&self.settings.cache_dir, SERVICE_ID)
    }

    /// Load the client secret and acquire a token, interactively if the
    /// cache cannot be used.
    pub async fn authenticate<A, MA>(&self, make_authorizer: MA) -> Result<Token>
    where
        A: Authorizer + Sync,
        MA: FnOnce(&ApplicationSecret) -> Result<A>,
    {
        let secret = load_client_secret(&self.settings.client_secret)?;
        let authorizer = make_authorizer(&secret)?;
        acquire_token(&self.token_cache(), &authorizer).await
    }

    #[instrument(name = "Export", skip_all, fields(range = %self.settings.range))]
    pub async fn run<A, S, MA, MS, W>(
        &self,
        make_authorizer: MA,
        connect: MS,
        console: &mut W,
    ) -> Result<ExportSummary>
    where
        A: Authorizer + Sync,
        S: SheetOperations + Sync,
        MA: FnOnce(&ApplicationSecret) -> Result<A>,
        MS: FnOnce(&Token) -> Result<S>,
        W: Write,
    {
        let span = Span::current();
        span.pb_set_style(
            &ProgressStyle::with_template("{spinner:.green} {span_name} {msg}")
                .map_err(|e| AppError::Other(e.into()))?,
        );

        span.pb_set_message("authenticating");
        let token = self.authenticate(make_authorizer).await?;
        let sheets = connect(&token)?;

        span.pb_set_message("fetching");
        let rows = sheets
            .fetch_range(&self.settings.spreadsheet_id, &self.settings.range)
            .await?;

        suspend_tracing_indicatif(|| output::print_rows(console, &rows))?;

        span.pb_set_message("writing");
        output::write_rows(&self.settings.output, &rows)?;

        Ok(ExportSummary {
            rows: rows.len(),
            output: self.settings.output.clone(),
        })
    }
}

#[cfg(test)]
mod mocks {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub(crate) struct MockSheetsClient {
        pub rows: Vec<Vec<Value>>,
        pub requests: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl SheetOperations for MockSheetsClient {
        async fn fetch_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<Value>>> {
            self.requests
                .lock()
                .unwrap()
                .push((spreadsheet_id.to_string(), range.to_string()));
            Ok(self.rows.clone())
        }
    }
}
