pub mod cache_service;
pub mod fulfillment_service;
pub mod log_service;
pub mod normalizer;
pub mod oauth_service;
pub mod order_service;
pub mod platform;
pub mod store_service;
pub mod webhook_service;
