//! Conversion of platform order payloads into the canonical order record.
//!
//! Every function here is pure: the payload is never modified and is kept
//! verbatim in `raw_payload`. The only failure is a payload without the
//! platform's order identifier.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::order::NewOrder;
use crate::models::platform::{OrderStatus, PlatformKind};
use crate::utils::time::parse_platform_timestamp;

const DEFAULT_CURRENCY: &str = "USD";

const WEBFLOW_STATUSES: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("unfulfilled", OrderStatus::Pending),
    ("fulfilled", OrderStatus::Completed),
    ("disputed", OrderStatus::Disputed),
    ("dispute-lost", OrderStatus::Refunded),
    ("refunded", OrderStatus::Refunded),
];

const CART_STATUSES: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("authorized", OrderStatus::Pending),
    ("paid", OrderStatus::Processing),
    ("partially_paid", OrderStatus::Processing),
    ("partially_refunded", OrderStatus::Processing),
    ("fulfilled", OrderStatus::Completed),
    ("refunded", OrderStatus::Refunded),
    ("voided", OrderStatus::Cancelled),
    ("cancelled", OrderStatus::Cancelled),
];

const SELF_HOSTED_STATUSES: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("checkout-draft", OrderStatus::Pending),
    ("processing", OrderStatus::Processing),
    ("on-hold", OrderStatus::OnHold),
    ("completed", OrderStatus::Completed),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
    ("failed", OrderStatus::Failed),
];

fn status_table(kind: PlatformKind) -> &'static [(&'static str, OrderStatus)] {
    match kind {
        PlatformKind::Webflow => WEBFLOW_STATUSES,
        PlatformKind::Cart => CART_STATUSES,
        PlatformKind::SelfHosted => SELF_HOSTED_STATUSES,
    }
}

/// Table lookup; unknown native statuses map to `pending`.
pub fn map_status(kind: PlatformKind, native: &str) -> OrderStatus {
    let native = native.trim().to_lowercase();
    status_table(kind)
        .iter()
        .find(|(name, _)| *name == native)
        .map(|(_, status)| *status)
        .unwrap_or(OrderStatus::Pending)
}

/// The payload field carrying the platform's order identifier.
pub fn order_id_field(kind: PlatformKind) -> &'static str {
    match kind {
        PlatformKind::Webflow => "orderId",
        PlatformKind::Cart | PlatformKind::SelfHosted => "id",
    }
}

pub fn extract_order_id(kind: PlatformKind, payload: &JsonValue) -> Option<String> {
    payload.get(order_id_field(kind)).and_then(scalar_string)
}

pub fn normalize(
    kind: PlatformKind,
    payload: &JsonValue,
    store_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<NewOrder> {
    let platform_order_id = extract_order_id(kind, payload).ok_or_else(|| {
        Error::InvalidOrderData(format!(
            "{} order payload is missing `{}`",
            kind,
            order_id_field(kind)
        ))
    })?;

    let fields = match kind {
        PlatformKind::Webflow => webflow_fields(payload),
        PlatformKind::Cart => cart_fields(payload),
        PlatformKind::SelfHosted => self_hosted_fields(payload),
    };

    let native_status = fields.native_status.unwrap_or_else(|| "pending".to_string());
    let order_date = fields
        .date
        .as_deref()
        .and_then(parse_platform_timestamp)
        .unwrap_or(now);

    Ok(NewOrder {
        store_id,
        platform: kind,
        order_number: fields.order_number.or_else(|| Some(platform_order_id.clone())),
        platform_order_id,
        status: map_status(kind, &native_status),
        customer_name: fields.customer_name,
        customer_email: fields.customer_email,
        total_amount: fields.total.unwrap_or(Decimal::ZERO).round_dp(2),
        currency: fields
            .currency
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        order_date,
        raw_payload: payload.clone(),
    })
}

#[derive(Debug, Default)]
struct ExtractedFields {
    order_number: Option<String>,
    native_status: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    total: Option<Decimal>,
    currency: Option<String>,
    date: Option<String>,
}

fn webflow_fields(payload: &JsonValue) -> ExtractedFields {
    let total = pointer_any(payload, &["/totals/total", "/customerPaid"]);
    ExtractedFields {
        order_number: None,
        native_status: text(payload, "/status"),
        customer_name: text(payload, "/customerInfo/fullName"),
        customer_email: text(payload, "/customerInfo/email"),
        total: total.and_then(|t| t.get("value")).and_then(decimal),
        currency: total.and_then(|t| t.get("unit")).and_then(scalar_string),
        date: text(payload, "/acceptedOn"),
    }
}

fn cart_fields(payload: &JsonValue) -> ExtractedFields {
    let native_status = if payload
        .get("cancelled_at")
        .map(|v| !v.is_null())
        .unwrap_or(false)
    {
        Some("cancelled".to_string())
    } else if text(payload, "/fulfillment_status").as_deref() == Some("fulfilled") {
        Some("fulfilled".to_string())
    } else {
        text(payload, "/financial_status")
    };

    ExtractedFields {
        order_number: payload
            .get("order_number")
            .and_then(scalar_string)
            .or_else(|| text(payload, "/name")),
        native_status,
        customer_name: full_name(payload, "/customer/first_name", "/customer/last_name"),
        customer_email: text(payload, "/customer/email")
            .or_else(|| text(payload, "/email"))
            .or_else(|| text(payload, "/contact_email")),
        total: payload.get("total_price").and_then(decimal),
        currency: text(payload, "/currency"),
        date: text(payload, "/created_at").or_else(|| text(payload, "/processed_at")),
    }
}

fn self_hosted_fields(payload: &JsonValue) -> ExtractedFields {
    ExtractedFields {
        order_number: payload.get("number").and_then(scalar_string),
        native_status: text(payload, "/status"),
        customer_name: full_name(payload, "/billing/first_name", "/billing/last_name"),
        customer_email: text(payload, "/billing/email"),
        total: payload.get("total").and_then(decimal),
        currency: text(payload, "/currency"),
        date: text(payload, "/date_created_gmt").or_else(|| text(payload, "/date_created")),
    }
}

fn pointer_any<'a>(payload: &'a JsonValue, pointers: &[&str]) -> Option<&'a JsonValue> {
    pointers
        .iter()
        .find_map(|p| payload.pointer(p).filter(|v| v.is_object()))
}

fn text(payload: &JsonValue, pointer: &str) -> Option<String> {
    payload
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => n.to_string().parse().ok(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn full_name(payload: &JsonValue, first: &str, last: &str) -> Option<String> {
    let joined = [text(payload, first), text(payload, last)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}
