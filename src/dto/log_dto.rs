use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub store_id: Option<Uuid>,
    pub limit: Option<i64>,
}
