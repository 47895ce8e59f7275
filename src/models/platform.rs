use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of external commerce systems a store can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Webflow-style hosted storefront with OAuth and a REST API.
    Webflow,
    /// Generic hosted cart platform.
    Cart,
    /// Self-hosted shop pushing its own order payloads.
    SelfHosted,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Webflow => "webflow",
            PlatformKind::Cart => "cart",
            PlatformKind::SelfHosted => "self_hosted",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webflow" | "platform_a" => Ok(PlatformKind::Webflow),
            "cart" | "platform_b" => Ok(PlatformKind::Cart),
            "self_hosted" => Ok(PlatformKind::SelfHosted),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Canonical, platform-agnostic order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    OnHold,
    Cancelled,
    Refunded,
    Disputed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Disputed => "disputed",
            OrderStatus::Failed => "failed",
        }
    }

    /// Refunded orders accept no further status-changing operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "on-hold" => Ok(OrderStatus::OnHold),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "disputed" => Ok(OrderStatus::Disputed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Pending,
    Active,
    Failed,
}

impl WebhookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookStatus::Pending => "pending",
            WebhookStatus::Active => "active",
            WebhookStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Info,
    Success,
    Warning,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Info => "info",
            LogStatus::Success => "success",
            LogStatus::Warning => "warning",
            LogStatus::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::OnHold,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::Disputed,
            OrderStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_value(OrderStatus::OnHold).unwrap(),
            serde_json::json!("on-hold")
        );
    }

    #[test]
    fn only_refunded_is_terminal() {
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn platform_accepts_legacy_aliases() {
        assert_eq!("platform_a".parse::<PlatformKind>().unwrap(), PlatformKind::Webflow);
        assert_eq!("platform_b".parse::<PlatformKind>().unwrap(), PlatformKind::Cart);
        assert!("magento".parse::<PlatformKind>().is_err());
    }
}
