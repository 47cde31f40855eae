//! Song Client - typed access to the line store's song endpoints.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use linecam_env::{LineTransport, TransportError, TransportExt};

use crate::line::{LineEntity, Song, SongSummary};

#[derive(Serialize)]
struct SongRequest {
    id: i32,
}

#[derive(Serialize)]
struct SkipLineRequest {
    skips: i32,
}

/// Fetches and posts songs and lines through a [`LineTransport`].
///
/// Failures are returned as-is; nothing is retried.
pub struct SongClient<T: LineTransport + ?Sized> {
    transport: Arc<T>,
}

impl<T: LineTransport + ?Sized> Clone for SongClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: LineTransport + ?Sized> SongClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// `GET /song?id=<id>`
    pub async fn song(&self, id: i32) -> Result<Song, TransportError> {
        let song = self
            .transport
            .get_json::<Song>(&format!("/song?id={}", id))
            .await?;
        debug!(song = id, lines = song.lines.len(), "fetched song");
        Ok(song)
    }

    /// `GET /songs`
    pub async fn songs(&self) -> Result<Vec<SongSummary>, TransportError> {
        self.transport.get_json("/songs").await
    }

    /// `POST /song` - stores a new song from its name and lyrics, one line
    /// per entry. Lines are trimmed by the store, not here.
    pub async fn add_song<I, S>(&self, name: &str, lyrics: I) -> Result<(), TransportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lyrics
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.transport
            .post_form("/song", &[("name", name), ("lines", lines.as_str())])
            .await?;
        debug!(song = name, "added song");
        Ok(())
    }

    /// `POST /song/set` - makes `id` the active song.
    pub async fn set_active_song(&self, id: i32) -> Result<(), TransportError> {
        self.transport.post_json("/song/set", &SongRequest { id }).await?;
        Ok(())
    }

    /// `POST /song/next` - moves the active line by `skips` (negative goes back).
    pub async fn next_line(&self, skips: i32) -> Result<(), TransportError> {
        self.transport
            .post_json("/song/next", &SkipLineRequest { skips })
            .await?;
        Ok(())
    }

    /// `POST /reset` - clears the active line.
    pub async fn reset(&self) -> Result<(), TransportError> {
        self.transport.post("/reset", None).await?;
        Ok(())
    }

    /// `PUT /song/edit` - stores an edited line.
    pub async fn edit_line(&self, line: &LineEntity) -> Result<(), TransportError> {
        self.transport.put_json("/song/edit", line).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nalgebra::Vector3;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory transport recording every request.
    #[derive(Default)]
    struct MemoryTransport {
        responses: HashMap<String, String>,
        requests: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl MemoryTransport {
        fn with(mut self, path: &str, body: &str) -> Self {
            self.responses.insert(path.to_string(), body.to_string());
            self
        }

        fn record(&self, method: &str, path: &str, body: Option<String>) -> Result<String, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((method.to_string(), path.to_string(), body));
            self.responses
                .get(path)
                .cloned()
                .ok_or_else(|| TransportError::Status {
                    status: 404,
                    url: path.to_string(),
                })
        }
    }

    #[async_trait]
    impl LineTransport for MemoryTransport {
        async fn get(&self, path: &str) -> Result<String, TransportError> {
            self.record("GET", path, None)
        }

        async fn post(&self, path: &str, json_body: Option<String>) -> Result<String, TransportError> {
            self.record("POST", path, json_body)
        }

        async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String, TransportError> {
            let body = fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            self.record("FORM", path, Some(body))
        }

        async fn put(&self, path: &str, json_body: String) -> Result<String, TransportError> {
            self.record("PUT", path, Some(json_body))
        }
    }

    const SONG: &str = r#"{
        "id": 2,
        "title": "Test",
        "lines": [{
            "id": 11,
            "line": "first line",
            "position": {"x": 0, "y": 0, "z": 0},
            "cam_look_at": {"x": 0, "y": 0, "z": 0},
            "cam_position": {"x": 0, "y": 10, "z": 150},
            "color": null,
            "keep_n_last": 0,
            "rotation": null,
            "cam_rotation": null,
            "end_position": {"x": 10, "y": 0, "z": 0},
            "cam_end_position": null,
            "cam_end_look_at": null
        }]
    }"#;

    #[tokio::test]
    async fn test_fetch_song() {
        let transport = Arc::new(MemoryTransport::default().with("/song?id=2", SONG));
        let client = SongClient::new(transport.clone());

        let song = client.song(2).await.unwrap();
        assert_eq!(song.title, "Test");
        assert_eq!(song.lines.len(), 1);
        let line = song.line(11).unwrap();
        assert_eq!(line.end_position, Some(Vector3::new(10.0, 0.0, 0.0)));
        assert!(line.is_animated());
    }

    #[tokio::test]
    async fn test_missing_song_is_status_error() {
        let client = SongClient::new(Arc::new(MemoryTransport::default()));
        let err = client.song(99).await.unwrap_err();
        assert!(err.is_status());
    }

    #[tokio::test]
    async fn test_malformed_song_is_decode_error() {
        let transport = Arc::new(MemoryTransport::default().with("/song?id=1", r#"{"id": 1}"#));
        let client = SongClient::new(transport);
        let err = client.song(1).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_list_songs() {
        let transport = Arc::new(
            MemoryTransport::default().with("/songs", r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#),
        );
        let client = SongClient::new(transport);
        let songs = client.songs().await.unwrap();
        assert_eq!(
            songs,
            vec![
                SongSummary { id: 1, name: "a".to_string() },
                SongSummary { id: 2, name: "b".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_control_requests() {
        let transport = Arc::new(
            MemoryTransport::default()
                .with("/song/set", "")
                .with("/song/next", "")
                .with("/reset", "")
                .with("/song/edit", ""),
        );
        let client = SongClient::new(transport.clone());

        client.set_active_song(3).await.unwrap();
        client.next_line(-2).await.unwrap();
        client.reset().await.unwrap();
        client.edit_line(&LineEntity::from_label("edited")).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0], ("POST".into(), "/song/set".into(), Some(r#"{"id":3}"#.into())));
        assert_eq!(requests[1], ("POST".into(), "/song/next".into(), Some(r#"{"skips":-2}"#.into())));
        assert_eq!(requests[2], ("POST".into(), "/reset".into(), None));
        assert_eq!(requests[3].0, "PUT");

        let edited: LineEntity = serde_json::from_str(requests[3].2.as_deref().unwrap()).unwrap();
        assert_eq!(edited.label, "edited");
    }

    #[tokio::test]
    async fn test_add_song_posts_newline_separated_lyrics() {
        let transport = Arc::new(MemoryTransport::default().with("/song", "Song added"));
        let client = SongClient::new(transport.clone());

        client
            .add_song("Duet", ["first line", "second line"])
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            (
                "FORM".into(),
                "/song".into(),
                Some("name=Duet&lines=first line\nsecond line".into())
            )
        );
    }

    #[tokio::test]
    async fn test_add_song_failure_propagates() {
        let client = SongClient::new(Arc::new(MemoryTransport::default()));
        let err = client.add_song("Nowhere", Vec::<String>::new()).await.unwrap_err();
        assert!(err.is_status());
    }
}
