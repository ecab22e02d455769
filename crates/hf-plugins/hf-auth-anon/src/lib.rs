//! # hf-auth-anon
//!
//! Anonymous implementation of `IdentityProvider`.
//! Mints a random principal on first use and, when given a path, keeps it across restarts.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use hf_core::models::Principal;
use hf_core::traits::IdentityProvider;
use tokio::sync::Mutex;

const PRINCIPAL_PREFIX: &str = "anon-";

pub struct AnonIdentityProvider {
    enabled: bool,
    /// Where the principal survives restarts; `None` keeps it for this process only
    persist_path: Option<PathBuf>,
    current: Mutex<Option<Principal>>,
}

impl AnonIdentityProvider {
    pub fn new(persist_path: Option<PathBuf>) -> Self {
        Self {
            enabled: true,
            persist_path,
            current: Mutex::new(None),
        }
    }

    /// A runtime without anonymous sign-in. Every call yields `None`.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            persist_path: None,
            current: Mutex::new(None),
        }
    }

    async fn load(&self) -> anyhow::Result<Option<Principal>> {
        let Some(path) = &self.persist_path else {
            return Ok(None);
        };
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let raw = raw.trim();
                Ok((!raw.is_empty()).then(|| Principal::new(raw)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading identity from {}", path.display())),
        }
    }

    async fn store(&self, principal: &Principal) -> anyhow::Result<()> {
        if let Some(path) = &self.persist_path {
            tokio::fs::write(path, principal.as_str())
                .await
                .with_context(|| format!("writing identity to {}", path.display()))?;
        }
        Ok(())
    }
}

/// `anon-` followed by 128 random bits in hex.
fn mint_principal() -> anyhow::Result<Principal> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("no entropy for identity: {e}"))?;
    Ok(Principal::new(format!("{PRINCIPAL_PREFIX}{}", hex::encode(bytes))))
}

#[async_trait]
impl IdentityProvider for AnonIdentityProvider {
    async fn ensure_identity(&self) -> anyhow::Result<Option<Principal>> {
        if !self.enabled {
            return Ok(None);
        }

        // Held across the whole check so concurrent callers share one principal
        let mut current = self.current.lock().await;
        if let Some(principal) = current.as_ref() {
            return Ok(Some(principal.clone()));
        }

        let principal = match self.load().await? {
            Some(saved) => saved,
            None => {
                let fresh = mint_principal()?;
                self.store(&fresh).await?;
                log::info!("Signed in anonymously as {}", fresh.as_str());
                fresh
            }
        };
        *current = Some(principal.clone());
        Ok(Some(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_identity_file() -> PathBuf {
        std::env::temp_dir().join(format!("hf-identity-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_identity_is_stable_within_a_process() {
        let provider = AnonIdentityProvider::new(None);
        let first = provider.ensure_identity().await.unwrap().unwrap();
        let second = provider.ensure_identity().await.unwrap().unwrap();

        assert_eq!(first, second);
        assert!(first.as_str().starts_with("anon-"));
        assert_eq!(first.as_str().len(), PRINCIPAL_PREFIX.len() + 32);
    }

    #[tokio::test]
    async fn test_identity_survives_restart() {
        let path = temp_identity_file();
        let first = AnonIdentityProvider::new(Some(path.clone()))
            .ensure_identity()
            .await
            .unwrap()
            .unwrap();
        let restarted = AnonIdentityProvider::new(Some(path.clone()))
            .ensure_identity()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, restarted);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_separate_providers_get_separate_identities() {
        let a = AnonIdentityProvider::new(None).ensure_identity().await.unwrap();
        let b = AnonIdentityProvider::new(None).ensure_identity().await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_disabled_provider_yields_none() {
        let provider = AnonIdentityProvider::disabled();
        assert!(provider.ensure_identity().await.unwrap().is_none());
    }
}
