//! HTTP plumbing for the consumer side

use crate::consumer::{Consumed, StreamConsumer};
use crate::error::StreamError;
use crate::frames::{FrameConsumer, FrameOutcome};
use crate::shape::RecordShape;
use lexiflow_common::{FramePayload, NDJSON_CONTENT_TYPE};
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::debug;

/// POST `payload` as JSON and return the response once its status is known to be 2xx
pub async fn open_stream<P: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
) -> Result<reqwest::Response, StreamError> {
    debug!("Opening stream: POST {}", url);
    let response = client
        .post(url)
        .header(ACCEPT, NDJSON_CONTENT_TYPE)
        .json(payload)
        .send()
        .await
        .map_err(|e| StreamError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Open a domain-record stream and consume it with `consumer`
pub async fn fetch_records<S, P, F>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
    consumer: StreamConsumer<S>,
    on_record: F,
) -> Result<Consumed<S::Record>, StreamError>
where
    S: RecordShape,
    P: Serialize + ?Sized,
    F: FnMut(&S::Record),
{
    let response = open_stream(client, url, payload).await?;
    consumer.consume(response.bytes_stream(), on_record).await
}

/// Open an event-frame stream and consume it with `consumer`
pub async fn fetch_frames<P, F>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
    consumer: FrameConsumer,
    on_payload: F,
) -> Result<FrameOutcome, StreamError>
where
    P: Serialize + ?Sized,
    F: FnMut(&FramePayload),
{
    let response = open_stream(client, url, payload).await?;
    consumer.consume(response.bytes_stream(), on_payload).await
}
