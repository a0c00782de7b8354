use serde::Serialize;

/// Default Graph API host.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Graph API version every request is pinned to.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Default per-request timeout for Graph API calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Meta / WhatsApp Business credentials and endpoint settings.
///
/// Loaded once at startup and shared read-only. Secrets are optional so
/// the service can boot (and report via `check-config`) without them;
/// Graph calls fail with `NotConfigured` until they are set.
#[derive(Clone, Default)]
pub struct MetaConfig {
    pub access_token: Option<String>,
    /// WhatsApp Business Account ID.
    pub waba_id: Option<String>,
    pub phone_number_id: Option<String>,
    /// Shared token for the webhook subscription handshake.
    pub verify_token: Option<String>,
    /// App secret used to sign webhook bodies.
    pub app_secret: Option<String>,
    pub graph_url: String,
    pub api_version: String,
    pub http_timeout_secs: u64,
}

impl std::fmt::Debug for MetaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("waba_id", &self.waba_id)
            .field("phone_number_id", &self.phone_number_id)
            .field("verify_token", &self.verify_token.as_ref().map(|_| "<redacted>"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("graph_url", &self.graph_url)
            .field("api_version", &self.api_version)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

/// Plausibility of each required secret, as reported by `check-config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheck {
    pub access_token: bool,
    pub waba_id: bool,
    pub phone_number_id: bool,
    pub verify_token: bool,
}

impl ConfigCheck {
    pub fn all_present(&self) -> bool {
        self.access_token && self.waba_id && self.phone_number_id && self.verify_token
    }
}

impl MetaConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                        | Default                      |
    /// |--------------------------------|------------------------------|
    /// | `WHATSAPP_ACCESS_TOKEN`        | unset                        |
    /// | `WHATSAPP_BUSINESS_ACCOUNT_ID` | unset                        |
    /// | `WHATSAPP_PHONE_NUMBER_ID`     | unset                        |
    /// | `WHATSAPP_VERIFY_TOKEN`        | unset                        |
    /// | `FACEBOOK_APP_SECRET`          | unset                        |
    /// | `META_GRAPH_URL`               | `https://graph.facebook.com` |
    /// | `META_API_VERSION`             | `v21.0`                      |
    /// | `META_HTTP_TIMEOUT_SECS`       | `30`                         |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let http_timeout_secs: u64 = get("META_HTTP_TIMEOUT_SECS")
            .map(|v| {
                v.parse()
                    .expect("META_HTTP_TIMEOUT_SECS must be a valid u64")
            })
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            access_token: get("WHATSAPP_ACCESS_TOKEN"),
            waba_id: get("WHATSAPP_BUSINESS_ACCOUNT_ID"),
            phone_number_id: get("WHATSAPP_PHONE_NUMBER_ID"),
            verify_token: get("WHATSAPP_VERIFY_TOKEN"),
            app_secret: get("FACEBOOK_APP_SECRET"),
            graph_url: get("META_GRAPH_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.into()),
            api_version: get("META_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.into()),
            http_timeout_secs,
        }
    }

    /// Check that each required secret is present and plausibly formed.
    pub fn check(&self) -> ConfigCheck {
        ConfigCheck {
            access_token: self.access_token.as_deref().is_some_and(|t| t.len() > 10),
            waba_id: self
                .waba_id
                .as_deref()
                .is_some_and(|id| id.chars().all(|c| c.is_ascii_digit())),
            phone_number_id: self
                .phone_number_id
                .as_deref()
                .is_some_and(|id| id.len() > 5),
            verify_token: self.verify_token.as_deref().is_some_and(|t| t.len() > 5),
        }
    }

    /// Versioned Graph base URL, e.g. `https://graph.facebook.com/v21.0`.
    pub fn versioned_base_url(&self) -> String {
        format!("{}/{}", self.graph_url, self.api_version)
    }
}
