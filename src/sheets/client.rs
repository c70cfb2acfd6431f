use super::SheetOperations;
use crate::error::{AppError, Result};
use crate::sheets::token::Token;
use async_trait::async_trait;
use google_sheets4::Sheets;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;
use tracing::{debug, instrument};

// Read-only access to spreadsheets
pub(crate) const AUTH_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

pub struct SheetsClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
}

impl SheetsClient {
    /// Create a SheetsClient that sends `token` as its bearer credential.
    pub fn new(token: &Token) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| AppError::Sheets(format!("Failed to load native root certificates: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        Ok(Self {
            hub: Sheets::new(client, token.access_token.clone()),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.hub.base_url(base_url);
        self
    }
}

#[async_trait]
impl SheetOperations for SheetsClient {
    #[instrument(name = "Fetching range", skip(self))]
    async fn fetch_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<Value>>> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .major_dimension("ROWS")
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| {
                AppError::Sheets(format!("Unable to retrieve data from sheet: {}", e))
            })?;

        let values = response.values.unwrap_or_default();
        debug!(rows = values.len(), range = ?response.range, "Fetched values");

        Ok(values)
    }
}
