//! Connection, authentication and retry settings for the service.

use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default maximum number of tries for a request (first attempt included).
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// Default delay between retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Documented service endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// DWS version 3, USA region.
    DwsVersion3Usa,
    /// DWS version 3, EU region.
    DwsVersion3Eu,
    /// DWS version 3, AUS region.
    DwsVersion3Aus,
    /// DWS version 2, USA region. The default endpoint.
    DwsVersion2Usa,
    /// A locally running Tornado server.
    Tornado,
}

impl Endpoint {
    /// The base URL for this endpoint.
    pub fn base_url(&self) -> &'static str {
        match self {
            Endpoint::DwsVersion3Usa => "https://us1.dws4.docmosis.com/api",
            Endpoint::DwsVersion3Eu => "https://eu1.dws4.docmosis.com/api",
            Endpoint::DwsVersion3Aus => "https://au1.dws4.docmosis.com/api",
            Endpoint::DwsVersion2Usa => "https://dws2.docmosis.com/services/rs",
            Endpoint::Tornado => "http://localhost:8080/api",
        }
    }

    /// Whether calls to this endpoint must carry an access key. The cloud
    /// endpoints all require one; a locally hosted Tornado does not.
    pub fn requires_access_key(&self) -> bool {
        !matches!(self, Endpoint::Tornado)
    }
}

/// HTTP proxy settings, with optional basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Proxy {
    /// Create proxy settings without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: None,
            password: None,
        }
    }

    pub(crate) fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let url = format!("http://{}:{}", self.host, self.port);
        let mut proxy = reqwest::Proxy::all(&url)
            .map_err(|e| Error::Configuration(format!("invalid proxy {}: {}", url, e)))?;
        if let Some(user) = &self.user {
            proxy = proxy.basic_auth(user, self.password.as_deref().unwrap_or(""));
        }
        Ok(proxy)
    }
}

/// Settings for communicating with a service endpoint.
///
/// An `Environment` is an immutable snapshot for the duration of a call.
/// Construct one explicitly, or set a process-wide default once at startup
/// with [`set_default_environment`]:
///
/// ```no_run
/// use dws_client::{Endpoint, Environment};
///
/// dws_client::set_default_environment(Environment::new(
///     Endpoint::DwsVersion2Usa,
///     "YOUR-ACCESS-KEY",
/// ))
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    /// Base URL of the service. Always non-empty.
    pub base_url: String,
    /// Shared-secret access key, sent as a form field on every call.
    /// Optional only for endpoints that do not require one (Tornado).
    pub access_key: Option<String>,
    /// Whether calls through this environment must carry an access key.
    /// Defaults to true; [`Environment::new`] derives it from the endpoint
    /// and [`Environment::tornado`] clears it.
    pub access_key_mandatory: bool,
    /// Maximum number of tries when a server/network error occurs.
    pub max_tries: u32,
    /// Delay applied between tries.
    pub retry_delay: Duration,
    /// Connect timeout; `None` leaves the client default.
    pub connect_timeout: Option<Duration>,
    /// Read (whole request) timeout; `None` leaves the client default.
    pub read_timeout: Option<Duration>,
    /// Optional HTTP proxy.
    pub proxy: Option<Proxy>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            base_url: Endpoint::DwsVersion2Usa.base_url().to_string(),
            access_key: None,
            access_key_mandatory: true,
            max_tries: DEFAULT_MAX_TRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: None,
            read_timeout: None,
            proxy: None,
        }
    }
}

impl Environment {
    /// Create an environment for a documented endpoint with the given key.
    pub fn new(endpoint: Endpoint, access_key: impl Into<String>) -> Self {
        Self {
            access_key_mandatory: endpoint.requires_access_key(),
            ..Self::with_base_url(endpoint.base_url(), access_key)
        }
    }

    /// Create an environment for a locally hosted Tornado server, which
    /// does not require an access key.
    pub fn tornado(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_key_mandatory: false,
            ..Self::default()
        }
    }

    /// Create an environment for an arbitrary base URL with the given key.
    pub fn with_base_url(base_url: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_key: Some(access_key.into()),
            ..Self::default()
        }
    }

    /// Combine the base URL with a service-relative path, normalizing the
    /// joining slash.
    pub fn url_for(&self, relative_path: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, relative_path.trim_start_matches('/'))
        } else if relative_path.starts_with('/') {
            format!("{}{}", self.base_url, relative_path)
        } else {
            format!("{}/{}", self.base_url, relative_path)
        }
    }

    /// Check that the minimum fields for a call are present.
    ///
    /// The base URL is always mandatory; the access key only when
    /// `access_key_mandatory` is set (all cloud operations require it).
    pub fn validate(&self, access_key_mandatory: bool) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Configuration(
                "environment does not have a base URL configured".to_string(),
            ));
        }
        if access_key_mandatory && self.access_key.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Configuration(
                "environment does not have an access key configured".to_string(),
            ));
        }
        Ok(())
    }
}

static DEFAULT_ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// Set the process-wide default environment.
///
/// May be called at most once, before any client is built from the default.
/// Subsequent calls fail with a configuration error rather than silently
/// replacing settings other threads may already be reading.
pub fn set_default_environment(env: Environment) -> Result<()> {
    DEFAULT_ENVIRONMENT
        .set(env)
        .map_err(|_| Error::Configuration("default environment already set".to_string()))
}

/// The process-wide default environment, if one has been set.
pub fn default_environment() -> Option<&'static Environment> {
    DEFAULT_ENVIRONMENT.get()
}
