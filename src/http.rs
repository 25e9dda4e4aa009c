use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::config::Settings;
use crate::retry::RetryPolicy;

/// Transport options shared by all upstream clients
#[derive(Debug, Clone, Copy)]
pub(crate) struct HttpOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl From<&Settings> for HttpOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.request_timeout_secs),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            retry: RetryPolicy::from(&settings.retry),
        }
    }
}

pub(crate) fn build_client(options: &HttpOptions) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(options.timeout)
        .connect_timeout(options.connect_timeout)
        .user_agent(concat!("flashnest/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Statuses that may succeed when repeated
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS.as_u16() || status >= 500
}

/// Trim a base URL so paths can be appended with a single `/`
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
