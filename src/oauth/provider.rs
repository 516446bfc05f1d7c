// OAuth2 flows against each platform's token endpoint

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::config::{OAuthAppConfig, OAuthConfig};
use crate::domain::Platform;
use crate::errors::{AppError, Result};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_ADS_SCOPE: &str = "https://www.googleapis.com/auth/adwords";

const META_AUTH_URL: &str = "https://www.facebook.com/v21.0/dialog/oauth";
const META_TOKEN_URL: &str = "https://graph.facebook.com/v21.0/oauth/access_token";
const META_SCOPES: &str = "ads_management,ads_read";

const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const LINKEDIN_SCOPES: &str = "r_ads r_ads_reporting rw_ads";

/// Fallback when a provider omits expires_in (Meta long-lived tokens
/// are documented at ~60 days)
const META_DEFAULT_EXPIRES_IN: i64 = 5_184_000;

/// A token grant result, uniform across providers
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct WireTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Client for the three providers' authorization and token endpoints
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn app_config(&self, platform: Platform) -> &OAuthAppConfig {
        match platform {
            Platform::GoogleAds => &self.config.google,
            Platform::MetaAds => &self.config.meta,
            Platform::LinkedInAds => &self.config.linkedin,
        }
    }

    /// Build the authorization redirect URL carrying the CSRF state
    pub fn authorize_url(&self, platform: Platform, state: &str) -> Result<String> {
        let app = self.app_config(platform);
        let url = match platform {
            Platform::GoogleAds => Url::parse_with_params(
                GOOGLE_AUTH_URL,
                &[
                    ("client_id", app.client_id.as_str()),
                    ("redirect_uri", app.redirect_uri.as_str()),
                    ("response_type", "code"),
                    ("scope", GOOGLE_ADS_SCOPE),
                    // Offline access is what yields a refresh token
                    ("access_type", "offline"),
                    ("prompt", "consent"),
                    ("state", state),
                ],
            ),
            Platform::MetaAds => Url::parse_with_params(
                META_AUTH_URL,
                &[
                    ("client_id", app.client_id.as_str()),
                    ("redirect_uri", app.redirect_uri.as_str()),
                    ("scope", META_SCOPES),
                    ("state", state),
                ],
            ),
            Platform::LinkedInAds => Url::parse_with_params(
                LINKEDIN_AUTH_URL,
                &[
                    ("response_type", "code"),
                    ("client_id", app.client_id.as_str()),
                    ("redirect_uri", app.redirect_uri.as_str()),
                    ("scope", LINKEDIN_SCOPES),
                    ("state", state),
                ],
            ),
        };
        url.map(|u| u.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build authorize URL: {}", e)))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Meta's code grant yields a short-lived token which is immediately
    /// exchanged for a long-lived one.
    pub async fn exchange_code(&self, platform: Platform, code: &str) -> Result<TokenResponse> {
        let app = self.app_config(platform);
        match platform {
            Platform::GoogleAds => {
                self.post_form(
                    GOOGLE_TOKEN_URL,
                    &[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("client_id", app.client_id.as_str()),
                        ("client_secret", app.client_secret.as_str()),
                        ("redirect_uri", app.redirect_uri.as_str()),
                    ],
                    3600,
                )
                .await
            }
            Platform::MetaAds => {
                let short_lived = self
                    .get_query(
                        META_TOKEN_URL,
                        &[
                            ("client_id", app.client_id.as_str()),
                            ("client_secret", app.client_secret.as_str()),
                            ("redirect_uri", app.redirect_uri.as_str()),
                            ("code", code),
                        ],
                        3600,
                    )
                    .await?;
                self.refresh(platform, &short_lived.access_token).await
            }
            Platform::LinkedInAds => {
                self.post_form(
                    LINKEDIN_TOKEN_URL,
                    &[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("client_id", app.client_id.as_str()),
                        ("client_secret", app.client_secret.as_str()),
                        ("redirect_uri", app.redirect_uri.as_str()),
                    ],
                    3600,
                )
                .await
            }
        }
    }

    /// Refresh-token grant. For Meta the input is the current long-lived
    /// access token (`fb_exchange_token` grant); the other providers take
    /// the stored refresh token.
    pub async fn refresh(&self, platform: Platform, token: &str) -> Result<TokenResponse> {
        let app = self.app_config(platform);
        match platform {
            Platform::GoogleAds => {
                self.post_form(
                    GOOGLE_TOKEN_URL,
                    &[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", token),
                        ("client_id", app.client_id.as_str()),
                        ("client_secret", app.client_secret.as_str()),
                    ],
                    3600,
                )
                .await
            }
            Platform::MetaAds => {
                self.get_query(
                    META_TOKEN_URL,
                    &[
                        ("grant_type", "fb_exchange_token"),
                        ("client_id", app.client_id.as_str()),
                        ("client_secret", app.client_secret.as_str()),
                        ("fb_exchange_token", token),
                    ],
                    META_DEFAULT_EXPIRES_IN,
                )
                .await
            }
            Platform::LinkedInAds => {
                self.post_form(
                    LINKEDIN_TOKEN_URL,
                    &[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", token),
                        ("client_id", app.client_id.as_str()),
                        ("client_secret", app.client_secret.as_str()),
                    ],
                    3600,
                )
                .await
            }
        }
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        default_expires_in: i64,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::OAuthExchange(e.to_string()))?;
        Self::parse_token_response(response, default_expires_in).await
    }

    async fn get_query(
        &self,
        url: &str,
        params: &[(&str, &str)],
        default_expires_in: i64,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::OAuthExchange(e.to_string()))?;
        Self::parse_token_response(response, default_expires_in).await
    }

    async fn parse_token_response(
        response: reqwest::Response,
        default_expires_in: i64,
    ) -> Result<TokenResponse> {
        let status = response.status();
        if !status.is_success() {
            // Provider error bodies are diagnostic, not secret
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::OAuthExchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let wire: WireTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuthExchange(format!("invalid token response: {}", e)))?;

        Ok(TokenResponse {
            access_token: wire.access_token,
            refresh_token: wire.refresh_token,
            expires_in: wire.expires_in.unwrap_or(default_expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthAppConfig;

    fn test_client() -> OAuthClient {
        OAuthClient::new(OAuthConfig {
            google: OAuthAppConfig {
                client_id: "gid".to_string(),
                client_secret: "gsec".to_string(),
                redirect_uri: "https://app.example.com/oauth/google_ads/callback".to_string(),
                developer_token: Some("devtok".to_string()),
            },
            meta: OAuthAppConfig {
                client_id: "mid".to_string(),
                client_secret: "msec".to_string(),
                redirect_uri: "https://app.example.com/oauth/meta_ads/callback".to_string(),
                developer_token: None,
            },
            linkedin: OAuthAppConfig {
                client_id: "lid".to_string(),
                client_secret: "lsec".to_string(),
                redirect_uri: "https://app.example.com/oauth/linkedin_ads/callback".to_string(),
                developer_token: None,
            },
        })
        .unwrap()
    }

    #[test]
    fn test_google_authorize_url_requests_offline_access() {
        let client = test_client();
        let url = client.authorize_url(Platform::GoogleAds, "st4te").unwrap();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("adwords"));
    }

    #[test]
    fn test_authorize_urls_carry_state() {
        let client = test_client();
        for platform in Platform::ALL {
            let url = client.authorize_url(platform, "abc123").unwrap();
            assert!(url.contains("state=abc123"), "{} missing state", platform);
            assert!(url.contains("client_id="), "{} missing client_id", platform);
        }
    }
}
