use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("chatrelay/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound HTTP client shared by the generator and the Telegram gateway.
///
/// `request_timeout` bounds the whole exchange, so long-poll callers must
/// add their poll window to it.
pub fn build_http_client(request_timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default http client");
            Client::new()
        })
}
