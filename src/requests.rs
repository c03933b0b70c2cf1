use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder, Proxy, StatusCode,
    header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, USER_AGENT},
};

use crate::config::TransportConfig;
use crate::error::Error;

/// Whole-round-trip deadline applied to every request, not just connect.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 5.1) AppleWebKit/537.11 (KHTML like Gecko) Chrome/23.0.1271.95 Safari/537.11";

/// Headers every eBilet request carries. The site turns away clients
/// that do not look like a browser.
fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

/// A fully read response. Reading the body to completion returns the
/// connection to the pool even when the caller discards the text.
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// The HTTP surface the login flow drives. Production uses
/// [`RequestClient`]; tests substitute a recording double.
#[async_trait]
pub trait Transport {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<RawResponse, Error>;

    async fn post_form(
        &self,
        url: &str,
        headers: HeaderMap,
        form: &[(&'static str, String)],
    ) -> Result<RawResponse, Error>;
}

/// One cookie jar and one connection pool, scoped to a single login
/// flow and discarded with it.
pub struct RequestClient {
    client: Client,
}

impl RequestClient {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let mut builder = ClientBuilder::new()
            .default_headers(base_headers())
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT);
        // For mitmproxy + HTTPS.
        if let Some(proxy) = &config.http_proxy {
            builder = builder
                .proxy(Proxy::all(proxy)?)
                .danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for RequestClient {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<RawResponse, Error> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    async fn post_form(
        &self,
        url: &str,
        headers: HeaderMap,
        form: &[(&'static str, String)],
    ) -> Result<RawResponse, Error> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}
