//! Cloud forwarder (C12): optional background upload of request metadata
//! to a remote sink. Never blocks the request path; failures are swallowed.

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Handed to the pipeline; `send` is non-blocking and infallible from the
/// caller's perspective (a full/closed channel just drops the record).
#[derive(Clone)]
pub struct CloudForwarder {
    sender: Option<UnboundedSender<Value>>,
}

impl CloudForwarder {
    /// Spawns the background worker and returns a handle, or a no-op
    /// handle if no ingest URL is configured.
    pub fn spawn(ingest_url: Option<String>, ingest_key: Option<String>) -> CloudForwarder {
        let Some(ingest_url) = ingest_url else {
            return CloudForwarder { sender: None };
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(ingest_url, ingest_key, rx));
        CloudForwarder { sender: Some(tx) }
    }

    pub fn disabled() -> CloudForwarder {
        CloudForwarder { sender: None }
    }

    pub fn forward(&self, record: Value) {
        if let Some(sender) = &self.sender {
            // An unbounded channel never backpressures the caller; a send
            // error just means the worker already shut down.
            let _ = sender.send(record);
        }
    }
}

async fn run_worker(ingest_url: String, ingest_key: Option<String>, mut rx: UnboundedReceiver<Value>) {
    let client = reqwest::Client::new();

    while let Some(record) = rx.recv().await {
        let mut request = client.post(&ingest_url).json(&record);
        if let Some(key) = &ingest_key {
            request = request.bearer_auth(key);
        }

        if let Err(e) = request.send().await {
            log::debug!("cloud forwarder upload failed, dropping record: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_forwarder_drops_silently() {
        let forwarder = CloudForwarder::disabled();
        forwarder.forward(serde_json::json!({"provider": "openai"}));
    }

    #[tokio::test]
    async fn spawn_with_no_url_is_disabled() {
        let forwarder = CloudForwarder::spawn(None, None);
        assert!(forwarder.sender.is_none());
    }
}
