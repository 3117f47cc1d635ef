use anyhow::{bail, Context, Result};
use bytes::Bytes;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// GET the feed body. Bounded by the client timeout and the cancellation token.
pub async fn fetch_feed(client: &Client, url: &str, cancel: &CancellationToken) -> Result<Bytes> {
    let request = async {
        let resp = client.get(url).send().await?.error_for_status()?;
        Ok::<_, reqwest::Error>(resp.bytes().await?)
    };
    tokio::select! {
        _ = cancel.cancelled() => bail!("fetch of {url} cancelled"),
        res = request => res.with_context(|| format!("fetching {url}")),
    }
}
