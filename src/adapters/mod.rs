//! Adapters for the external generation API.
//!
//! Both adapters degrade to local output instead of failing: captions come
//! from the template pool and images become rendered placeholders.

pub mod caption;
pub mod extract;
pub mod images;

pub use caption::CaptionAdapter;
pub use images::ImageAdapter;

use reqwest::Response;
use serde::Serialize;
use serde_json::Value;

use crate::config::GenAiSettings;
use crate::error::MorpherError;

/// Header the API reads the credential from.
const API_KEY_HEADER: &str = "x-goog-api-key";

fn build_client(settings: &GenAiSettings) -> Result<reqwest::Client, MorpherError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(MorpherError::from)
}

/// `<base>/models/<model>:<method>`
fn model_url(settings: &GenAiSettings, model: &str, method: &str) -> String {
    format!("{}/models/{model}:{method}", settings.base_url)
}

/// POSTs `body` with the credential and returns the parsed JSON reply.
async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> Result<Value, MorpherError> {
    let response: Response = client
        .post(url)
        .header(API_KEY_HEADER, api_key)
        .json(body)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(MorpherError::Adapter(format!(
            "{url} returned {status}: {}",
            text.chars().take(200).collect::<String>()
        )));
    }
    Ok(response.json::<Value>().await?)
}

#[cfg(test)]
pub(crate) mod testserver {
    use axum::Router;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub(crate) async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }
}
