pub mod log_dto;
pub mod oauth_dto;
pub mod order_dto;
pub mod store_dto;
pub mod webhook_dto;
