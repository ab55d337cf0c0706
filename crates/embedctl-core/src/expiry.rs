// ── Expiration monitor ──
//
// Classifies an embed configuration's remaining lifetime. Read-only: it
// recommends a refresh but never issues one, so every mutation still goes
// through the controller's commands.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use strum::Display;

use crate::model::EmbedConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Valid,
    NearingExpiry,
    Expired,
}

impl ExpiryStatus {
    /// Whether a presentation layer should call `refresh()` now.
    pub fn refresh_recommended(self) -> bool {
        !matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExpiryMonitor {
    lead: TimeDelta,
}

impl ExpiryMonitor {
    /// Leads too large to represent are clamped, which makes every
    /// configuration count as nearing expiry.
    pub fn new(lead: Duration) -> Self {
        Self {
            lead: TimeDelta::from_std(lead).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn lead(&self) -> Duration {
        self.lead.to_std().unwrap_or(Duration::ZERO)
    }

    pub fn status_at(&self, config: &EmbedConfiguration, now: DateTime<Utc>) -> ExpiryStatus {
        if !config.is_valid_at(now) {
            ExpiryStatus::Expired
        } else if self.warning_edge(config).is_none_or(|edge| now >= edge) {
            ExpiryStatus::NearingExpiry
        } else {
            ExpiryStatus::Valid
        }
    }

    /// How long until [`status_at`](Self::status_at) would return something
    /// different. `None` once expired, as nothing follows.
    pub fn until_next_transition(
        &self,
        config: &EmbedConfiguration,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let next = match self.status_at(config, now) {
            ExpiryStatus::Valid => self.warning_edge(config)?,
            ExpiryStatus::NearingExpiry => config.expires_at,
            ExpiryStatus::Expired => return None,
        };
        (next - now).to_std().ok()
    }

    fn warning_edge(&self, config: &EmbedConfiguration) -> Option<DateTime<Utc>> {
        config.expires_at.checked_sub_signed(self.lead)
    }
}
