mod auth;
mod client;
mod token;

pub use auth::{Authorizer, InteractiveAuthorizer, acquire_token, load_client_secret};
pub use client::SheetsClient;
pub use token::{SERVICE_ID, Token, TokenCache};

#[cfg(test)]
pub(crate) use auth::mocks::MockAuthorizer;
#[cfg(test)]
pub(crate) use token::test_helpers::mock_token;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait SheetOperations {
    /// Read the cells of `range` (A1 notation) as rows of loosely typed values.
    async fn fetch_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<Value>>>;
}
