use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("virtual-stylist/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
});

/// Shared client; per-request timeouts are applied by the caller.
pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
