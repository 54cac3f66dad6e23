//! Tenant credential lookup.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::config::TenantConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::provider::types::{Credential, TenantCredentials};

/// Source of tenant credentials.
///
/// Issuing tokens is outside this crate; implementations wrap whatever system
/// owns them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Credentials for `tenant_id`, or `UnknownTenant`.
    async fn credentials(&self, tenant_id: &str) -> DispatchResult<TenantCredentials>;

    /// Obtain a fresh access token after the provider rejected the current one.
    async fn refresh(&self, tenant_id: &str) -> DispatchResult<Credential>;
}

/// Credentials fixed at startup (from the config file), replaceable on reload.
#[derive(Default)]
pub struct StaticCredentialStore {
    tenants: RwLock<HashMap<String, TenantCredentials>>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config<'a>(tenants: impl IntoIterator<Item = (&'a String, &'a TenantConfig)>) -> Self {
        let store = Self::new();
        store.replace(tenants);
        store
    }

    /// Register or overwrite one tenant.
    pub fn insert(&self, tenant_id: impl Into<String>, credentials: TenantCredentials) {
        self.tenants
            .write()
            .expect("credential store lock poisoned")
            .insert(tenant_id.into(), credentials);
    }

    /// Replace every tenant with the given set.
    pub fn replace<'a>(&self, tenants: impl IntoIterator<Item = (&'a String, &'a TenantConfig)>) {
        let next: HashMap<String, TenantCredentials> = tenants
            .into_iter()
            .map(|(id, tenant)| {
                (
                    id.clone(),
                    TenantCredentials {
                        phone_number_id: tenant.phone_number_id.clone(),
                        credential: Credential::new(tenant.access_token.clone()),
                    },
                )
            })
            .collect();
        *self.tenants.write().expect("credential store lock poisoned") = next;
    }

    pub fn len(&self) -> usize {
        self.tenants.read().expect("credential store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn credentials(&self, tenant_id: &str) -> DispatchResult<TenantCredentials> {
        self.tenants
            .read()
            .expect("credential store lock poisoned")
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownTenant(tenant_id.to_string()))
    }

    /// Static tokens cannot be refreshed; hand back the current one so the
    /// single permitted retry still happens (a config reload may have rotated it).
    async fn refresh(&self, tenant_id: &str) -> DispatchResult<Credential> {
        let credentials = self.credentials(tenant_id).await?;
        tracing::warn!(tenant_id = %tenant_id, "Static credential store cannot refresh tokens");
        Ok(credentials.credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tenants() -> BTreeMap<String, TenantConfig> {
        let mut tenants = BTreeMap::new();
        tenants.insert(
            "T1".to_string(),
            TenantConfig {
                phone_number_id: "1001".into(),
                access_token: "token-1".into(),
            },
        );
        tenants
    }

    #[tokio::test]
    async fn test_lookup_from_config() {
        let store = StaticCredentialStore::from_config(&tenants());
        let creds = store.credentials("T1").await.unwrap();
        assert_eq!(creds.phone_number_id, "1001");
        assert_eq!(creds.credential.access_token, "token-1");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tenant() {
        let store = StaticCredentialStore::new();
        let err = store.credentials("nobody").await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTenant(t) if t == "nobody"));
        assert!(store.refresh("nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_replace_rotates_tokens() {
        let store = StaticCredentialStore::from_config(&tenants());
        let mut next = tenants();
        next.get_mut("T1").unwrap().access_token = "token-2".into();
        store.replace(&next);
        assert_eq!(store.refresh("T1").await.unwrap().access_token, "token-2");
    }
}
