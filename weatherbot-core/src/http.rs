use anyhow::{Context, Result, anyhow};
use reqwest::{Certificate, Client, Proxy, Url};
use std::{fs, path::Path, time::Duration};
use tracing::{error, info};

/// Parse a proxy url. Only plain HTTP(S) proxies are supported.
pub fn parse_proxy(proxy: &str) -> Result<Proxy> {
    let url = Url::parse(proxy)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .ok_or_else(|| anyhow!("Invalid proxy: {proxy}"))?;

    Proxy::all(url).with_context(|| format!("Invalid proxy: {proxy}"))
}

fn load_certificate(path: &Path) -> Result<Certificate> {
    let pem = fs::read(path)
        .with_context(|| format!("Failed to read certificate file {}", path.display()))?;
    Certificate::from_pem(&pem)
        .with_context(|| format!("Failed to parse certificate file {}", path.display()))
}

/// Build the client shared by the Matrix and weather connections.
///
/// `request_timeout` must exceed the sync long-poll timeout. An unreadable `trust`
/// certificate is logged and skipped; an invalid proxy is an error.
pub fn build_client(
    proxy: Option<&str>,
    trust: Option<&Path>,
    request_timeout: Duration,
) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("weatherbot/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy) = proxy {
        builder = builder.proxy(parse_proxy(proxy)?);
        info!(%proxy, "using proxy");
    }

    if let Some(path) = trust {
        match load_certificate(path) {
            Ok(cert) => builder = builder.add_root_certificate(cert),
            Err(e) => error!("Failed to load certificate file {}: {e:#}", path.display()),
        }
    }

    builder.build().context("Failed to build HTTP client")
}
