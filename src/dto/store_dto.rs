use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::platform::PlatformKind;
use crate::models::store::Store;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStorePayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub platform: PlatformKind,
    #[validate(length(min = 1))]
    pub platform_site_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectSitePayload {
    #[validate(length(min = 1))]
    pub site_id: String,
    pub title: Option<String>,
}

/// Store as shown to operators. Credentials are reduced to a connected flag.
#[derive(Debug, Serialize)]
pub struct StoreView {
    #[serde(flatten)]
    pub store: Store,
    pub connected: bool,
}

impl From<Store> for StoreView {
    fn from(store: Store) -> Self {
        let connected = store.is_connected();
        Self { store, connected }
    }
}
