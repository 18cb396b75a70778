use std::time::Duration;

use tokio::time::timeout;

use crate::error::{Error, Result};

/// Sends `request` and reads the whole body, bounded by `limit`.
///
/// Connection failures and timeouts both come back as [`Error::Network`]; any HTTP
/// status, including 4xx/5xx, is a successful exchange at this level.
pub(crate) async fn exchange(
    request: reqwest::RequestBuilder,
    limit: Duration,
    endpoint: &str,
) -> Result<(u16, Vec<u8>)> {
    let call = async {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body.to_vec()))
    };

    match timeout(limit, call).await {
        Ok(Ok(exchange)) => Ok(exchange),
        Ok(Err(e)) => Err(Error::from_transport(e)),
        Err(_) => Err(Error::Network(format!(
            "request to '{}' timed out after {} ms",
            endpoint,
            limit.as_millis()
        ))),
    }
}
