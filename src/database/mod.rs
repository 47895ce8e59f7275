pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use repository::{LogRepository, OrderRepository, SettingsRepository, StoreRepository};

use std::sync::Arc;

/// The full set of storage collaborators a running service needs.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub logs: Arc<dyn LogRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repositories {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            stores: Arc::new(postgres::PgStoreRepository::new(pool.clone())),
            orders: Arc::new(postgres::PgOrderRepository::new(pool.clone())),
            logs: Arc::new(postgres::PgLogRepository::new(pool.clone())),
            settings: Arc::new(postgres::PgSettingsRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            stores: Arc::new(memory::MemoryStoreRepository::default()),
            orders: Arc::new(memory::MemoryOrderRepository::default()),
            logs: Arc::new(memory::MemoryLogRepository::default()),
            settings: Arc::new(memory::MemorySettingsRepository::default()),
        }
    }
}
