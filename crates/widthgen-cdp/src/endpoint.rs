//! Target discovery via the DevTools HTTP listing.

use crate::{Error, Result};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// One entry of `GET http://<host>/json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent for targets another client is already attached to.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl Endpoint {
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// Builds the listing URL for a `host:port` pair (a scheme prefix is tolerated).
pub fn listing_url(host: &str) -> Result<Url> {
    let trimmed = host.trim().trim_end_matches('/');
    let base = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let mut url = Url::parse(&base).map_err(|source| Error::InvalidHost {
        host: host.to_string(),
        source,
    })?;
    url.set_path("/json");
    Ok(url)
}

/// Lists every debuggable target the browser exposes.
pub async fn endpoints(host: &str) -> Result<Vec<Endpoint>> {
    let url = listing_url(host)?;
    debug!(%url, "listing DevTools endpoints");
    let list = reqwest::get(url)
        .await?
        .error_for_status()?
        .json::<Vec<Endpoint>>()
        .await?;
    Ok(list)
}

/// Returns the first `page` target that can be attached to.
pub async fn find_page(host: &str) -> Result<Endpoint> {
    let list = endpoints(host).await?;
    first_page(list).ok_or(Error::NoPage)
}

pub(crate) fn first_page(list: Vec<Endpoint>) -> Option<Endpoint> {
    list.into_iter()
        .find(|ep| ep.is_page() && ep.web_socket_debugger_url.is_some())
}
