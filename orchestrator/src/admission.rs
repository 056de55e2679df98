//! Admission control (spec §4.3): quota checks before a job is queued.
//! Fails open when the limiter backend itself errors, so a persistence
//! outage degrades to "allow" rather than blocking every request.

use chess_common::Platform;
use chrono::{Datelike, Utc};
use persistence::UsageStore;

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Anonymous,
    Hobby,
    Pro,
}

impl Tier {
    fn monthly_cap(self) -> Option<i64> {
        match self {
            Tier::Anonymous => None,
            Tier::Hobby => Some(100),
            Tier::Pro => None,
        }
    }

    const ANONYMOUS_DAILY_CAP: i64 = 3;
}

pub struct AdmissionControl {
    usage: UsageStore,
}

pub struct AdmissionDecision {
    pub allowed: bool,
    pub limit: i64,
    pub current_usage: i64,
}

impl AdmissionControl {
    pub fn new(usage: UsageStore) -> Self {
        Self { usage }
    }

    pub async fn check_anonymous(&self, client_ip: &str) -> AdmissionDecision {
        let day = Utc::now().format("%Y-%m-%d").to_string();
        match self.usage.record_anonymous(client_ip, &day).await {
            Ok(count) => AdmissionDecision {
                allowed: count <= Tier::ANONYMOUS_DAILY_CAP,
                limit: Tier::ANONYMOUS_DAILY_CAP,
                current_usage: count,
            },
            Err(e) => {
                tracing::warn!(error = %e, "rate limiter backend unavailable, failing open");
                AdmissionDecision {
                    allowed: true,
                    limit: Tier::ANONYMOUS_DAILY_CAP,
                    current_usage: 0,
                }
            }
        }
    }

    pub async fn check_authenticated(
        &self,
        user_id: &str,
        platform: Platform,
        tier: Tier,
    ) -> AdmissionDecision {
        let Some(cap) = tier.monthly_cap() else {
            return AdmissionDecision {
                allowed: true,
                limit: i64::MAX,
                current_usage: 0,
            };
        };

        let now = Utc::now();
        let month = format!("{:04}-{:02}", now.year(), now.month());
        match self.usage.record_authenticated(user_id, platform, &month).await {
            Ok(count) => AdmissionDecision {
                allowed: count <= cap,
                limit: cap,
                current_usage: count,
            },
            Err(e) => {
                tracing::warn!(error = %e, "rate limiter backend unavailable, failing open");
                AdmissionDecision {
                    allowed: true,
                    limit: cap,
                    current_usage: 0,
                }
            }
        }
    }

    pub fn decision_to_result(decision: &AdmissionDecision) -> Result<(), OrchestratorError> {
        if decision.allowed {
            return Ok(());
        }
        Err(OrchestratorError::RateLimitExceeded {
            limit: decision.limit,
            current_usage: decision.current_usage,
            remaining: (decision.limit - decision.current_usage).max(0),
            resets_in_hours: 24,
        })
    }
}
