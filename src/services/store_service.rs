use crate::database::StoreRepository;
use crate::error::{Error, Result};
use crate::models::platform::{PlatformKind, WebhookStatus};
use crate::models::store::{NewStore, OAuthCredentials, Store};
use crate::services::cache_service::QueryCache;
use crate::utils::time::Clock;
use std::sync::Arc;
use uuid::Uuid;

const LIST_KEY: &str = "stores:list";

#[derive(Clone)]
pub struct StoreService {
    repo: Arc<dyn StoreRepository>,
    list_cache: QueryCache<Vec<Store>>,
}

impl StoreService {
    pub fn new(repo: Arc<dyn StoreRepository>, clock: Arc<dyn Clock>, cache_ttl_secs: u64) -> Self {
        Self {
            repo,
            list_cache: QueryCache::new(cache_ttl_secs, clock),
        }
    }

    /// A site id may belong to one store only; `owner` is the store allowed to hold it.
    async fn ensure_site_free(&self, site_id: &str, owner: Option<Uuid>) -> Result<()> {
        match self.repo.find_by_site_id(site_id).await? {
            Some(other) if Some(other.id) != owner => Err(Error::Conflict(format!(
                "Site {} is already linked to store {}",
                site_id, other.id
            ))),
            _ => Ok(()),
        }
    }

    pub async fn create(&self, mut store: NewStore) -> Result<Store> {
        if store.title.trim().is_empty() {
            return Err(Error::BadRequest("Store title is required".to_string()));
        }
        store.platform_site_id = store
            .platform_site_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(site_id) = store.platform_site_id.as_deref() {
            self.ensure_site_free(site_id, None).await?;
        }
        let store = self.repo.insert(store).await?;
        self.list_cache.invalidate_all();
        tracing::info!(store_id = %store.id, platform = %store.platform_type, "store created");
        Ok(store)
    }

    pub async fn get(&self, id: Uuid) -> Result<Store> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Store {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Store>> {
        if let Some(stores) = self.list_cache.get(LIST_KEY) {
            return Ok(stores);
        }
        let stores = self.repo.list().await?;
        self.list_cache.insert(LIST_KEY.to_string(), stores.clone());
        Ok(stores)
    }

    pub async fn find_by_site_id(&self, site_id: &str) -> Result<Option<Store>> {
        self.repo.find_by_site_id(site_id).await
    }

    pub async fn first_with_site(&self, platform: PlatformKind) -> Result<Option<Store>> {
        self.repo.first_with_site(platform).await
    }

    pub async fn save_credentials(
        &self,
        id: Uuid,
        credentials: &OAuthCredentials,
    ) -> Result<Store> {
        let store = self.repo.update_credentials(id, credentials).await?;
        self.list_cache.invalidate_all();
        Ok(store)
    }

    pub async fn select_site(&self, id: Uuid, site_id: &str, title: Option<&str>) -> Result<Store> {
        let site_id = site_id.trim();
        if site_id.is_empty() {
            return Err(Error::BadRequest("site_id is required".to_string()));
        }
        self.ensure_site_free(site_id, Some(id)).await?;
        let store = self.repo.update_site(id, site_id, title).await?;
        self.list_cache.invalidate_all();
        Ok(store)
    }

    pub async fn set_webhook_status(&self, id: Uuid, status: WebhookStatus) -> Result<Store> {
        let store = self.repo.update_webhook_status(id, status).await?;
        self.list_cache.invalidate_all();
        Ok(store)
    }
}
