use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Platform
// ============================================================================

/// Supported advertising platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GoogleAds,
    MetaAds,
    LinkedInAds,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::GoogleAds, Platform::MetaAds, Platform::LinkedInAds];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GoogleAds => "google_ads",
            Platform::MetaAds => "meta_ads",
            Platform::LinkedInAds => "linkedin_ads",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "google_ads" => Some(Platform::GoogleAds),
            "meta_ads" => Some(Platform::MetaAds),
            "linkedin_ads" => Some(Platform::LinkedInAds),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Account status
// ============================================================================

/// Connection status of a tenant's platform account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    NotConnected,
    Active,
    ExpiringSoon,
    Expired,
    Revoked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::NotConnected => "not_connected",
            AccountStatus::Active => "active",
            AccountStatus::ExpiringSoon => "expiring_soon",
            AccountStatus::Expired => "expired",
            AccountStatus::Revoked => "revoked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_connected" => Some(AccountStatus::NotConnected),
            "active" => Some(AccountStatus::Active),
            "expiring_soon" => Some(AccountStatus::ExpiringSoon),
            "expired" => Some(AccountStatus::Expired),
            "revoked" => Some(AccountStatus::Revoked),
            _ => None,
        }
    }
}

// ============================================================================
// Token health
// ============================================================================

/// Derived token health, classified from time remaining until expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHealth {
    Active,
    ExpiringSoon,
    Expired,
    Revoked,
}

impl TokenHealth {
    /// Classify from the token expiry timestamp.
    ///
    /// Exactly 7 days remaining is `ExpiringSoon`; anything negative is
    /// `Expired`. Accounts without an expiry on record are treated as expired.
    pub fn classify(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(expires_at) = expires_at else {
            return TokenHealth::Expired;
        };
        let remaining = expires_at - now;
        if remaining < Duration::zero() {
            TokenHealth::Expired
        } else if remaining <= Duration::days(7) {
            TokenHealth::ExpiringSoon
        } else {
            TokenHealth::Active
        }
    }

    pub fn as_account_status(&self) -> AccountStatus {
        match self {
            TokenHealth::Active => AccountStatus::Active,
            TokenHealth::ExpiringSoon => AccountStatus::ExpiringSoon,
            TokenHealth::Expired => AccountStatus::Expired,
            TokenHealth::Revoked => AccountStatus::Revoked,
        }
    }
}

// ============================================================================
// AdAccount
// ============================================================================

/// A tenant's connection to one advertising platform.
///
/// At most one per (tenant_id, platform). Token fields hold AEAD ciphertext;
/// plaintext only exists transiently inside the vault.
#[derive(Debug, Clone)]
pub struct AdAccount {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: Platform,
    pub account_id: String,
    pub account_name: String,
    pub status: AccountStatus,
    pub encrypted_access_token: Option<Vec<u8>>,
    pub encrypted_refresh_token: Option<Vec<u8>>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub last_alerted_status: Option<AccountStatus>,
    pub metadata: serde_json::Value,
}

impl AdAccount {
    pub fn is_connected(&self) -> bool {
        !matches!(
            self.status,
            AccountStatus::NotConnected | AccountStatus::Revoked
        ) && self.encrypted_access_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        let now = Utc::now();

        // Exactly 7 days out is expiring_soon
        let health = TokenHealth::classify(Some(now + Duration::days(7)), now);
        assert_eq!(health, TokenHealth::ExpiringSoon);

        // One second beyond the boundary is active
        let health = TokenHealth::classify(Some(now + Duration::days(7) + Duration::seconds(1)), now);
        assert_eq!(health, TokenHealth::Active);

        // One second in the past is expired
        let health = TokenHealth::classify(Some(now - Duration::seconds(1)), now);
        assert_eq!(health, TokenHealth::Expired);

        // Zero remaining is still expiring_soon, not expired
        let health = TokenHealth::classify(Some(now), now);
        assert_eq!(health, TokenHealth::ExpiringSoon);
    }

    #[test]
    fn test_connect_time_expires_in_seven_days() {
        // An account connected with expires_in=604800 observed exactly at
        // the boundary classifies as expiring_soon.
        let connected_at = Utc::now();
        let expires_at = connected_at + Duration::seconds(604_800);
        let health = TokenHealth::classify(Some(expires_at), connected_at);
        assert_eq!(health, TokenHealth::ExpiringSoon);
    }

    #[test]
    fn test_missing_expiry_is_expired() {
        assert_eq!(TokenHealth::classify(None, Utc::now()), TokenHealth::Expired);
    }

    #[test]
    fn test_platform_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_str(platform.as_str()), Some(platform));
        }
        assert_eq!(Platform::from_str("tiktok_ads"), None);
    }
}
