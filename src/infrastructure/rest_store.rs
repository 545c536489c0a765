// REST live store - Firebase-style realtime database over HTTP
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::application::live_store::{LiveStore, Snapshot, SnapshotStream};
use crate::error::PatrolError;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Live store client speaking the database's REST dialect: `GET {path}.json`
/// for snapshots, `PUT {path}.json` for replace-at-key, and a
/// `text/event-stream` subscription for change notifications. Change events
/// only signal that the path moved; the full snapshot is re-read so every
/// delivery is the complete record set.
#[derive(Debug, Clone)]
pub struct RestLiveStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl RestLiveStore {
    pub fn new(base_url: String, auth_token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        match &self.auth_token {
            Some(token) => format!(
                "{}/{}.json?auth={}",
                self.base_url,
                path,
                urlencoding::encode(token)
            ),
            None => format!("{}/{}.json", self.base_url, path),
        }
    }
}

#[async_trait]
impl LiveStore for RestLiveStore {
    fn watch(&self, path: &str) -> SnapshotStream {
        let client = self.client.clone();
        let url = self.url_for(path);
        let path = path.to_string();

        Box::pin(async_stream::stream! {
            loop {
                let response = client
                    .get(&url)
                    .header("Accept", "text/event-stream")
                    .send()
                    .await;

                let response = match response {
                    Ok(r) if r.status().is_success() => r,
                    Ok(r) => {
                        yield Err(sync_error(&path, format!("subscribe returned {}", r.status())));
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                    Err(e) => {
                        yield Err(sync_error(&path, e.to_string()));
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };

                let mut chunks = response.bytes_stream();
                let mut buffer = String::new();

                'connection: while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(sync_error(&path, e.to_string()));
                            break 'connection;
                        }
                    };
                    buffer.push_str(&String::from_utf8_lossy(&chunk));

                    while let Some(frame_end) = buffer.find("\n\n") {
                        let frame: String = buffer.drain(..frame_end + 2).collect();
                        match parse_sse_event(&frame).as_deref() {
                            Some("put") | Some("patch") => {
                                // the contract is full-replace: re-read the path
                                yield fetch_snapshot(&client, &url, &path).await;
                            }
                            Some("cancel") | Some("auth_revoked") => {
                                yield Err(sync_error(&path, "subscription revoked".into()));
                                break 'connection;
                            }
                            // keep-alive and unknown events carry no data
                            _ => {}
                        }
                    }
                }

                tracing::debug!("event stream for '{}' ended, reconnecting", path);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    async fn replace(&self, path: &str, value: &Value) -> Result<(), PatrolError> {
        let url = self.url_for(path);
        let response = self
            .client
            .put(&url)
            .json(value)
            .send()
            .await
            .map_err(|e| PatrolError::Write {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PatrolError::Write {
                path: path.to_string(),
                message: format!("store returned {}", response.status()),
            });
        }

        Ok(())
    }
}

async fn fetch_snapshot(
    client: &reqwest::Client,
    url: &str,
    path: &str,
) -> Result<Snapshot, PatrolError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| sync_error(path, e.to_string()))?;

    if !response.status().is_success() {
        return Err(sync_error(path, format!("read returned {}", response.status())));
    }

    let value = response
        .json::<Value>()
        .await
        .map_err(|e| sync_error(path, e.to_string()))?;

    Ok(snapshot_from_value(path, value))
}

fn snapshot_from_value(path: &str, value: Value) -> Snapshot {
    match value {
        // an absent path is "no records", not an error
        Value::Null => Snapshot::new(),
        Value::Object(map) => map.into_iter().collect(),
        // densely indexed collections come back as arrays with index keys
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            tracing::warn!("unexpected payload shape at '{}': {}", path, other);
            Snapshot::new()
        }
    }
}

/// Extract the event name from one server-sent-events frame.
fn parse_sse_event(frame: &str) -> Option<String> {
    frame
        .lines()
        .find_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
}

fn sync_error(path: &str, message: String) -> PatrolError {
    PatrolError::Sync {
        collection: path.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_from_absent_path() {
        assert!(snapshot_from_value("tasks", Value::Null).is_empty());
    }

    #[test]
    fn test_snapshot_from_keyed_records() {
        let snapshot = snapshot_from_value(
            "cameras",
            json!({ "-abc": { "lat": 1.0 }, "-def": { "lat": 2.0 } }),
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["-abc"], json!({ "lat": 1.0 }));
    }

    #[test]
    fn test_snapshot_from_indexed_array() {
        let snapshot =
            snapshot_from_value("cameras", json!([{ "lat": 1.0 }, null, { "lat": 3.0 }]));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["0"], json!({ "lat": 1.0 }));
        assert_eq!(snapshot["2"], json!({ "lat": 3.0 }));
    }

    #[test]
    fn test_parse_sse_event() {
        let frame = "event: put\ndata: {\"path\":\"/\",\"data\":null}";
        assert_eq!(parse_sse_event(frame).as_deref(), Some("put"));
        assert_eq!(parse_sse_event("data: keep-alive"), None);
    }

    #[test]
    fn test_url_building_encodes_the_token() {
        let store = RestLiveStore::new(
            "https://store.example.com/".to_string(),
            Some("se cret".to_string()),
        );
        assert_eq!(
            store.url_for("tasks"),
            "https://store.example.com/tasks.json?auth=se%20cret"
        );

        let open = RestLiveStore::new("https://store.example.com".to_string(), None);
        assert_eq!(open.url_for("clusters"), "https://store.example.com/clusters.json");
    }
}
