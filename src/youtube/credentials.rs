// API key pool - rotates to the next key when one runs out of quota

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{AppConfig, ConfigError};
use crate::subtitles::errors::ExtractError;

/// Ordered Data API keys plus the index of the one in use.
///
/// Lives in the request context; the index only moves forward, so a key that
/// hit its quota is not retried for the lifetime of the pool.
#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::MissingApiKeys);
        }
        Ok(Self {
            keys,
            current: AtomicUsize::new(0),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::new(config.require_api_keys()?.to_vec())
    }

    /// Key in use, `None` once every key is spent
    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.current.load(Ordering::SeqCst)).map(String::as_str)
    }

    /// 1-based position of the key in use (for logs)
    pub fn position(&self) -> usize {
        self.current.load(Ordering::SeqCst) + 1
    }

    /// Move to the next key. Returns false when none is left.
    pub fn advance(&self) -> bool {
        let next = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        if next < self.keys.len() {
            log::warn!("[ApiKeys] Switching to API key #{} of {}", next + 1, self.keys.len());
            true
        } else {
            self.current.store(self.keys.len(), Ordering::SeqCst);
            false
        }
    }

    /// Run `op` with the current key; on quota/authorization failure advance
    /// and retry the same operation, once per remaining key.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ExtractError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        loop {
            let key = self.current().ok_or(ExtractError::CredentialsExhausted)?.to_string();
            match op(key).await {
                Err(e) if e.is_quota() => {
                    log::warn!("[ApiKeys] Key #{} rejected: {}", self.position(), e);
                    if !self.advance() {
                        return Err(ExtractError::CredentialsExhausted);
                    }
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn pool(keys: &[&str]) -> ApiKeyPool {
        ApiKeyPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_empty_pool_is_config_error() {
        assert_eq!(ApiKeyPool::new(Vec::new()).unwrap_err(), ConfigError::MissingApiKeys);
        let config = AppConfig::default();
        assert!(ApiKeyPool::from_config(&config).is_err());
    }

    #[test]
    fn test_starts_at_first_key() {
        let pool = pool(&["a", "b"]);
        assert_eq!(pool.current(), Some("a"));
        assert!(pool.advance());
        assert_eq!(pool.current(), Some("b"));
        assert!(!pool.advance());
        assert_eq!(pool.current(), None);
        assert!(!pool.advance());
        assert_eq!(pool.current(), None);
    }

    #[tokio::test]
    async fn test_rotates_on_quota() {
        let pool = pool(&["a", "b", "c"]);
        let seen = Mutex::new(Vec::new());

        let result = pool
            .run(|key| {
                seen.lock().unwrap().push(key.clone());
                async move {
                    if key == "c" {
                        Ok(42)
                    } else {
                        Err(ExtractError::QuotaExceeded("quotaExceeded".to_string()))
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        // Later calls keep using the working key
        assert_eq!(pool.current(), Some("c"));
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let pool = pool(&["a", "b"]);
        let result: Result<(), _> = pool
            .run(|_| async { Err(ExtractError::Forbidden("403".to_string())) })
            .await;
        assert_eq!(result, Err(ExtractError::CredentialsExhausted));
        assert_eq!(
            ExtractError::CredentialsExhausted.to_string(),
            "All API credentials exhausted; try again later"
        );
    }

    #[tokio::test]
    async fn test_other_errors_do_not_rotate() {
        let pool = pool(&["a", "b"]);
        let result: Result<(), _> = pool
            .run(|_| async { Err(ExtractError::Http("500".to_string())) })
            .await;
        assert_eq!(result, Err(ExtractError::Http("500".to_string())));
        assert_eq!(pool.current(), Some("a"));
    }
}
