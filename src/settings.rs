//! Session settings attached to a handler definition.
//!
//! The transport layer reads these once when it resolves the handler for a
//! request and enforces them itself (timers, buffer limits, cookies, script
//! injection). This module only declares the values.
//!
//! # Example
//!
//! ```
//! use sockjs_handler::settings::SessionSettings;
//!
//! let settings = SessionSettings::from_toml_str(
//!     r#"
//!     websocketEnabled = false
//!     heartbeatMs = 10000
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(!settings.websocket_enabled());
//! assert_eq!(settings.heartbeat_ms(), 10_000);
//! assert_eq!(settings.send_buffer_capacity(), 256);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SockJsError};

/// Default heartbeat interval in milliseconds.
pub const DEFAULT_HEARTBEAT_MS: u64 = 25_000;

/// Default session timeout in milliseconds.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 5_000;

/// Default streaming byte quota before a streaming response is recycled.
pub const DEFAULT_STREAMING_QUOTA_BYTES: u64 = 128 * 1024;

/// Default outbound send buffer capacity, in messages.
pub const DEFAULT_SEND_BUFFER_CAPACITY: usize = 256;

/// Default session receive buffer capacity, in bytes.
pub const DEFAULT_SESSION_BUFFER_CAPACITY_BYTES: usize = 64 * 1024;

/// Client script served by the default iframe page.
pub const DEFAULT_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/sockjs-client@1/dist/sockjs.min.js";

/// Cookie name used by the `JSESSIONID` strategy.
pub const JSESSIONID: &str = "JSESSIONID";

/// Where the iframe transport loads the client script from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptLocation {
    /// The public CDN build.
    #[default]
    DefaultCdn,
    /// An explicit URL.
    Url(String),
}

impl ScriptLocation {
    /// The script URL to inject.
    pub fn url(&self) -> &str {
        match self {
            ScriptLocation::DefaultCdn => DEFAULT_SCRIPT_URL,
            ScriptLocation::Url(url) => url,
        }
    }
}

/// How the transport emits sticky-session cookies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CookieStrategy {
    /// No cookie.
    #[default]
    None,
    /// Echo or mint a `JSESSIONID` cookie.
    JSessionId,
    /// Echo or mint a cookie with the given name.
    Named(String),
}

impl CookieStrategy {
    /// Whether clients must send cookies (reported by the info endpoint).
    pub fn cookie_needed(&self) -> bool {
        !matches!(self, CookieStrategy::None)
    }

    /// Cookie name, if any.
    pub fn cookie_name(&self) -> Option<&str> {
        match self {
            CookieStrategy::None => None,
            CookieStrategy::JSessionId => Some(JSESSIONID),
            CookieStrategy::Named(name) => Some(name),
        }
    }
}

/// Declarative transport configuration for one handler definition.
///
/// Immutable once built. Serialized field names are camelCase
/// (`heartbeatMs`, `sendBufferCapacity`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    script_location_strategy: ScriptLocation,
    cookie_strategy: CookieStrategy,
    websocket_enabled: bool,
    heartbeat_ms: u64,
    session_timeout_ms: u64,
    streaming_quota_bytes: u64,
    send_buffer_capacity: usize,
    session_buffer_capacity_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            script_location_strategy: ScriptLocation::DefaultCdn,
            cookie_strategy: CookieStrategy::None,
            websocket_enabled: true,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            streaming_quota_bytes: DEFAULT_STREAMING_QUOTA_BYTES,
            send_buffer_capacity: DEFAULT_SEND_BUFFER_CAPACITY,
            session_buffer_capacity_bytes: DEFAULT_SESSION_BUFFER_CAPACITY_BYTES,
        }
    }
}

impl SessionSettings {
    /// Start from the defaults.
    pub fn builder() -> SessionSettingsBuilder {
        SessionSettingsBuilder::default()
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawSessionSettings = toml::from_str(source)?;
        raw.validate()
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: RawSessionSettings = serde_json::from_str(source)?;
        raw.validate()
    }

    /// Where the iframe page loads the client script from.
    pub fn script_location_strategy(&self) -> &ScriptLocation {
        &self.script_location_strategy
    }

    /// Sticky-session cookie behaviour.
    pub fn cookie_strategy(&self) -> &CookieStrategy {
        &self.cookie_strategy
    }

    /// Whether the websocket transport is offered.
    pub fn websocket_enabled(&self) -> bool {
        self.websocket_enabled
    }

    /// Heartbeat interval in milliseconds.
    pub fn heartbeat_ms(&self) -> u64 {
        self.heartbeat_ms
    }

    /// How long a session without a receiving connection is kept, in milliseconds.
    pub fn session_timeout_ms(&self) -> u64 {
        self.session_timeout_ms
    }

    /// Bytes a streaming response may carry before it is recycled.
    pub fn streaming_quota_bytes(&self) -> u64 {
        self.streaming_quota_bytes
    }

    /// Outbound buffer size, in messages.
    pub fn send_buffer_capacity(&self) -> usize {
        self.send_buffer_capacity
    }

    /// Receive buffer size, in bytes.
    pub fn session_buffer_capacity_bytes(&self) -> usize {
        self.session_buffer_capacity_bytes
    }

    /// Heartbeat interval as a `Duration`.
    #[inline]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    /// Session timeout as a `Duration`.
    #[inline]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

/// Builder for [`SessionSettings`].
///
/// Setters take unsigned values, so every combination is valid.
#[derive(Debug, Clone, Default)]
pub struct SessionSettingsBuilder {
    settings: SessionSettings,
}

impl SessionSettingsBuilder {
    /// Set the client script location.
    pub fn script_location_strategy(mut self, location: ScriptLocation) -> Self {
        self.settings.script_location_strategy = location;
        self
    }

    /// Set the cookie strategy.
    pub fn cookie_strategy(mut self, strategy: CookieStrategy) -> Self {
        self.settings.cookie_strategy = strategy;
        self
    }

    /// Enable or disable the websocket transport.
    pub fn websocket_enabled(mut self, enabled: bool) -> Self {
        self.settings.websocket_enabled = enabled;
        self
    }

    /// Heartbeat interval, in milliseconds.
    pub fn heartbeat_ms(mut self, ms: u64) -> Self {
        self.settings.heartbeat_ms = ms;
        self
    }

    /// Session timeout, in milliseconds.
    pub fn session_timeout_ms(mut self, ms: u64) -> Self {
        self.settings.session_timeout_ms = ms;
        self
    }

    /// Streaming quota, in bytes.
    pub fn streaming_quota_bytes(mut self, bytes: u64) -> Self {
        self.settings.streaming_quota_bytes = bytes;
        self
    }

    /// Outbound buffer size, in messages.
    pub fn send_buffer_capacity(mut self, messages: usize) -> Self {
        self.settings.send_buffer_capacity = messages;
        self
    }

    /// Receive buffer size, in bytes.
    pub fn session_buffer_capacity_bytes(mut self, bytes: usize) -> Self {
        self.settings.session_buffer_capacity_bytes = bytes;
        self
    }

    /// Finish building.
    pub fn build(self) -> SessionSettings {
        self.settings
    }
}

/// Unvalidated settings as they appear in a config document.
///
/// Numeric fields are wide and signed so that negative values reach
/// validation instead of failing as an opaque type error, and every unsigned
/// value the builder accepts loads back.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct RawSessionSettings {
    script_location_strategy: ScriptLocation,
    cookie_strategy: CookieStrategy,
    websocket_enabled: bool,
    heartbeat_ms: i128,
    session_timeout_ms: i128,
    streaming_quota_bytes: i128,
    send_buffer_capacity: i128,
    session_buffer_capacity_bytes: i128,
}

impl Default for RawSessionSettings {
    fn default() -> Self {
        let defaults = SessionSettings::default();
        Self {
            script_location_strategy: defaults.script_location_strategy,
            cookie_strategy: defaults.cookie_strategy,
            websocket_enabled: defaults.websocket_enabled,
            heartbeat_ms: defaults.heartbeat_ms as i128,
            session_timeout_ms: defaults.session_timeout_ms as i128,
            streaming_quota_bytes: defaults.streaming_quota_bytes as i128,
            send_buffer_capacity: defaults.send_buffer_capacity as i128,
            session_buffer_capacity_bytes: defaults.session_buffer_capacity_bytes as i128,
        }
    }
}

impl RawSessionSettings {
    fn validate(self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            script_location_strategy: self.script_location_strategy,
            cookie_strategy: self.cookie_strategy,
            websocket_enabled: self.websocket_enabled,
            heartbeat_ms: non_negative("heartbeatMs", self.heartbeat_ms)?,
            session_timeout_ms: non_negative("sessionTimeoutMs", self.session_timeout_ms)?,
            streaming_quota_bytes: non_negative("streamingQuotaBytes", self.streaming_quota_bytes)?,
            send_buffer_capacity: non_negative("sendBufferCapacity", self.send_buffer_capacity)?,
            session_buffer_capacity_bytes: non_negative(
                "sessionBufferCapacityBytes",
                self.session_buffer_capacity_bytes,
            )?,
        })
    }
}

fn non_negative<T: TryFrom<i128>>(field: &str, value: i128) -> Result<T> {
    T::try_from(value).map_err(|_| {
        let reason = if value < 0 {
            "must be non-negative"
        } else {
            "is out of range"
        };
        SockJsError::InvalidArgument(format!("{field} {reason}, got {value}"))
    })
}
