use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BrowseError, BrowseResult};

const MAX_FRAME_SIZE: usize = 1024 * 1024 * 16; // 16MB frames

pub const ROOT_PATH: &str = "/";

/// Events the client emits towards the listing server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    ListDir(ListDirRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDirRequest {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// Events the listing server pushes to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    ListDirResult(ListDirResponse),
    ListDirStatus(LoadingStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDirResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ListingData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EntryDetails>,
    #[serde(default)]
    pub children: Vec<Entry>,
}

/// Advisory busy notification; `status` is `"loading"` in practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingStatus {
    pub status: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl LoadingStatus {
    pub fn is_loading(&self) -> bool {
        self.status == "loading"
    }
}

/// Servers report either numeric or textual error codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One immutable file or directory record as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    #[serde(default)]
    pub details: EntryDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }
}

/// The entries and folder metadata for one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub path: String,
    pub details: Option<EntryDetails>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "Error {code}: {}", self.message),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

/// What a `list_dir_result` means once interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Listing(Listing),
    Failure(ServerFailure),
    /// No `data` on a non-error response; treated as "not arrived yet".
    Incomplete,
}

impl ListDirResponse {
    /// Path echoed by the server, if the response carries data.
    pub fn path(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.path.as_str())
    }

    pub fn outcome(self) -> Outcome {
        if self.status == ResponseStatus::Error {
            return Outcome::Failure(ServerFailure {
                code: self.code,
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        match self.data {
            Some(data) => Outcome::Listing(Listing {
                path: data.path,
                details: data.details,
                entries: data.children,
            }),
            None => Outcome::Incomplete,
        }
    }
}

/// Writes one length-prefixed JSON frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> BrowseResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg = serde_json::to_vec(message)?;
    if msg.len() > MAX_FRAME_SIZE {
        return Err(BrowseError::FrameTooLarge { len: msg.len() });
    }
    // Send message length as u32 first
    let len = msg.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&msg).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame body. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame_bytes<R>(reader: &mut R) -> BrowseResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(BrowseError::FrameTooLarge { len });
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> BrowseResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_dir_request_shape() {
        let event = ClientEvent::ListDir(ListDirRequest {
            path: "/docs".to_string(),
            request_id: None,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "list_dir", "payload": {"path": "/docs"}}));
    }

    #[test]
    fn test_parse_listing_response() {
        let value = json!({
            "event": "list_dir_result",
            "payload": {
                "status": "ok",
                "data": {
                    "path": "/",
                    "children": [
                        {"type": "directory", "path": "/docs", "details": {"name": "docs", "count": 3}}
                    ]
                }
            }
        });
        let event: ServerEvent = serde_json::from_value(value).unwrap();
        let ServerEvent::ListDirResult(response) = event else {
            panic!("expected list_dir_result");
        };
        let Outcome::Listing(listing) = response.outcome() else {
            panic!("expected a listing");
        };
        assert_eq!(listing.path, "/");
        assert_eq!(listing.entries.len(), 1);
        assert!(listing.entries[0].is_dir());
        assert_eq!(listing.entries[0].details.count, Some(3));
    }

    #[test]
    fn test_error_response_outcome() {
        let response: ListDirResponse = serde_json::from_value(json!({
            "status": "error",
            "code": 404,
            "message": "Not found"
        }))
        .unwrap();
        let Outcome::Failure(failure) = response.outcome() else {
            panic!("expected failure");
        };
        assert_eq!(failure.code, Some(ErrorCode::Number(404)));
        assert_eq!(failure.to_string(), "Error 404: Not found");
    }

    #[test]
    fn test_missing_data_is_incomplete() {
        let response: ListDirResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(response.outcome(), Outcome::Incomplete);
    }

    #[test]
    fn test_unknown_status_without_data_is_incomplete() {
        let response: ListDirResponse =
            serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert_eq!(response.status, ResponseStatus::Unknown);
        assert_eq!(response.outcome(), Outcome::Incomplete);
    }

    #[tokio::test]
    async fn test_frame_codec() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let event = ClientEvent::ListDir(ListDirRequest {
            path: "/music".to_string(),
            request_id: Some(7),
        });
        write_frame(&mut client, &event).await.unwrap();
        drop(client);

        let bytes = read_frame_bytes(&mut server).await.unwrap().unwrap();
        let decoded: ClientEvent = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, event);
        assert!(read_frame_bytes(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_SIZE as u32) + 1;
        client.write_all(&len.to_be_bytes()).await.unwrap();

        let result = read_frame_bytes(&mut server).await;
        assert!(matches!(result, Err(BrowseError::FrameTooLarge { len }) if len == MAX_FRAME_SIZE + 1));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_io_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(b"{\"ev").await.unwrap();
        drop(client);

        let result = read_frame_bytes(&mut server).await;
        assert!(matches!(result, Err(BrowseError::Io(_))));
    }

    #[test]
    fn test_undecodable_frame_is_protocol_error() {
        let result = decode_frame::<ServerEvent>(b"{\"event\": \"nope\"}");
        assert!(matches!(result, Err(BrowseError::Protocol(_))));
    }
}
