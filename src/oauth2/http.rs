//! HTTP bridge between the `oauth2`/`openidconnect` crates and `reqwest`
//!
//! Both crates take a caller-supplied async HTTP client for their outbound
//! calls (token exchange, discovery). This bridge runs them through a
//! `reqwest` client with redirects disabled and a bounded timeout, so a
//! stalled provider surfaces as a failed exchange rather than a hung
//! request. The client is built once and shared so its connection pool
//! survives across calls.

use std::time::Duration;

/// Timeout applied to every outbound provider request.
pub(crate) const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared `reqwest` client for outbound provider calls.
pub(crate) fn provider_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        // Following redirects on the token endpoint would be an SSRF vector
        .redirect(reqwest::redirect::Policy::none())
        .timeout(PROVIDER_TIMEOUT)
        .build()
}

/// Run one `oauth2`/`openidconnect` request through a `reqwest` client.
pub(crate) async fn send_request(
    client: reqwest::Client,
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse, reqwest::Error> {
    let method = request.method().clone();
    let url = request.uri().to_string();
    let headers = request.headers().clone();
    let body = request.into_body();

    let mut request_builder = client.request(method, &url).body(body);
    for (name, value) in &headers {
        request_builder = request_builder.header(name.as_str(), value.as_bytes());
    }

    let response = request_builder.send().await?;

    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    let mut builder = http::Response::builder().status(status_code);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }
    // Built from components reqwest already validated
    Ok(builder.body(body).expect("failed to build HTTP response"))
}
