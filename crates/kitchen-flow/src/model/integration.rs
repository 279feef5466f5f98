//! Bookkeeping for orders that arrive from external ordering channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Originating system of an order. `Odin` is the internal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    #[default]
    Odin,
    PosExterno,
    Api,
    Web,
    Mobile,
}

impl Channel {
    pub fn is_external(self) -> bool {
        self != Self::Odin
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Odin => "ODIN",
            Self::PosExterno => "POS_EXTERNO",
            Self::Api => "API",
            Self::Web => "WEB",
            Self::Mobile => "MOBILE",
        })
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ODIN" => Ok(Self::Odin),
            "POS_EXTERNO" => Ok(Self::PosExterno),
            "API" => Ok(Self::Api),
            "WEB" => Ok(Self::Web),
            "MOBILE" => Ok(Self::Mobile),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Synced,
    Pending,
    Failed,
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Synced => "SYNCED",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
        })
    }
}

/// Sync state with the originating channel. Never present on `Odin` orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_order_id: Option<String>,
    pub sync_status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Set exactly when `sync_status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

impl Integration {
    /// Fresh integration record for an order just received from `channel`.
    pub fn received(
        channel: Channel,
        external_order_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            channel,
            external_order_id,
            sync_status: SyncStatus::Pending,
            received_at: Some(now),
            last_sync_at: None,
            failed_reason: None,
        }
    }
}
