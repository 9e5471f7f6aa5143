use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::util::truncate_to_char_boundary;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_ERROR_BODY_BYTES: usize = 500;

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Send `request` and decode a 2xx JSON body. Non-2xx responses become an
/// error carrying the status and the start of the body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .with_context(|| format!("{provider} request failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "{provider} API error ({status}): {}",
            truncate_to_char_boundary(&body, MAX_ERROR_BODY_BYTES)
        ));
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("{provider} returned an unexpected response body"))
}
