use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Identifies our entry in the shared `~/.credentials` directory.
pub const SERVICE_ID: &str = "sheets.googleapis.com-gsheet-export.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// On-disk cache holding a single token.
///
/// A token read back from the cache is used as-is: expiry is recorded but
/// never checked, and nothing here refreshes it.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(dir: &Path, service_id: &str) -> Self {
        let file_name: String = url::form_urlencoded::byte_serialize(service_id.as_bytes()).collect();
        Self {
            path: dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Token> {
        debug!(path = ?self.path, "Reading cached token");

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| AppError::TokenCache(format!("Failed to read tokens file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| AppError::TokenCache(format!("Failed to parse tokens: {}", e)))
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)
                .map_err(|e| {
                    AppError::TokenCache(format!("Failed to create token cache directory: {}", e))
                })?;
        }

        let contents = serde_json::to_string_pretty(token)
            .map_err(|e| AppError::TokenCache(format!("Failed to serialize tokens: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| AppError::TokenCache(format!("Failed to create tokens file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::TokenCache(format!("Failed to write tokens file: {}", e)))?;

        info!(path = ?self.path, "Saved token to cache");

        Ok(())
    }

    /// Remove the cached token, if there is one.
    #[instrument(name = "Clearing cached token", skip_all)]
    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("No cached token to clear");
            return Ok(());
        }

        fs::remove_file(&self.path)
            .map_err(|e| AppError::TokenCache(format!("Failed to delete tokens file: {}", e)))?;
        info!("Cleared cached token");

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_cache_file_name_is_escaped() {
        let cache = TokenCache::new(Path::new("/home/user/.credentials"), "a b/c.json");
        assert_eq!(
            cache.path(),
            Path::new("/home/user/.credentials/a+b%2Fc.json")
        );

        let cache = TokenCache::new(Path::new("/creds"), SERVICE_ID);
        assert_eq!(
            cache.path(),
            Path::new("/creds/sheets.googleapis.com-gsheet-export.json")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path(), SERVICE_ID);

        let err = cache.load().unwrap_err();
        assert!(matches!(err, AppError::TokenCache(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path(), SERVICE_ID);
        fs::write(cache.path(), "{not json").unwrap();

        let err = cache.load().unwrap_err();
        assert!(matches!(err, AppError::TokenCache(_)));
    }

    #[test]
    fn test_expired_token_is_still_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path(), SERVICE_ID);
        let token = test_helpers::mock_token("expired_access");

        cache.save(&token).unwrap();

        assert_eq!(cache.load().unwrap(), token);
    }

    #[test]
    fn test_save_creates_private_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join(".credentials");
        let cache = TokenCache::new(&cache_dir, SERVICE_ID);

        cache.save(&test_helpers::mock_token("abc")).unwrap();

        let dir_mode = fs::metadata(&cache_dir).unwrap().permissions().mode();
        let file_mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path(), SERVICE_ID);

        cache.save(&test_helpers::mock_token("first_token_is_longer")).unwrap();
        cache.save(&test_helpers::mock_token("second")).unwrap();

        assert_eq!(cache.load().unwrap().access_token, "second");
    }

    #[test]
    fn test_token_without_optional_fields() {
        let token: Token =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"Bearer"}"#).unwrap();

        assert_eq!(token.refresh_token, None);
        assert_eq!(token.expiry, None);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path(), SERVICE_ID);

        cache.clear().unwrap();

        cache.save(&test_helpers::mock_token("abc")).unwrap();
        cache.clear().unwrap();
        assert!(!cache.path().exists());
    }
}
