use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, COOKIE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::file_info::FileRecord;
use crate::format::truncate_label;
use crate::progress::UploadProgress;

const CLIENT_AGENT: &str = concat!("cloudsync/", env!("CARGO_PKG_VERSION"));

/// Client for the sync server's JSON API.
#[derive(Debug, Clone)]
pub struct CloudSyncClient {
    client: Client,
    config: Config,
}

/// Any reply without a non-empty `error` key counts as success.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

/// A local file checked and ready to be posted.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub path: PathBuf,
    pub file_name: String,
    pub len: u64,
}

impl UploadSource {
    pub async fn inspect(path: &Path) -> Result<UploadSource> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(_) => return Err(Error::NoFileSelected(path.to_path_buf())),
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty());
        match file_name {
            Some(name) if meta.is_file() => Ok(UploadSource {
                path: path.to_path_buf(),
                file_name: name.to_string(),
                len: meta.len(),
            }),
            _ => Err(Error::NoFileSelected(path.to_path_buf())),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl CloudSyncClient {
    pub fn new(config: Config) -> Result<CloudSyncClient> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_AGENT));
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie.trim())
                .map_err(|e| Error::Config(format!("invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .connect_timeout(config.timeout())
            .build()?;

        Ok(CloudSyncClient { client, config })
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let url = self.endpoint(&["api", "files"])?;
        tracing::info!("GET {}", url);
        let res = self
            .client
            .get(url)
            .timeout(self.config.timeout())
            .send()
            .await?;
        let files: Vec<FileRecord> = self.read_reply(res).await?;
        tracing::info!("loaded {} file records", files.len());
        Ok(files)
    }

    /// Posts `source` as the multipart field `file`, counting every chunk into `progress`.
    pub async fn upload(
        &self,
        source: &UploadSource,
        progress: &UploadProgress,
    ) -> Result<UploadReceipt> {
        let url = self.endpoint(&["api", "sync", "upload"])?;
        tracing::info!("POST {} ({}, {} bytes)", url, source.file_name, source.len);

        let file = tokio::fs::File::open(&source.path).await?;
        let counter = progress.clone();
        let stream =
            ReaderStream::new(file).inspect_ok(move |chunk| counter.add(chunk.len() as u64));
        let part = Part::stream_with_length(Body::wrap_stream(stream), source.len)
            .file_name(source.file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let res = self.client.post(url).multipart(form).send().await?;
        let receipt: UploadReceipt = self.read_reply(res).await?;
        tracing::info!(
            "upload of {} finished: {:?} {:?}",
            source.file_name,
            receipt.status,
            receipt.file_id
        );
        Ok(receipt)
    }

    /// Starts a download and returns the response once the server accepted it.
    pub async fn download_response(&self, id: &str) -> Result<Response> {
        let url = self.endpoint(&["api", "sync", "download", id])?;
        tracing::info!("GET {}", url);
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.unauthorized());
        }
        if !status.is_success() {
            let body = res.text().await?;
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(b) => b.error,
                Err(_) => describe_failure(status, &body),
            };
            return Err(Error::Api(message));
        }
        Ok(res)
    }

    /// Downloads file `id` into `dest_dir` and returns the written path.
    ///
    /// The body goes to a temporary file in `dest_dir` that only replaces the target once
    /// the whole stream has arrived; a broken transfer leaves nothing behind.
    pub async fn download(&self, id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let res = self.download_response(id).await?;
        let name = attachment_name(res.headers()).unwrap_or_else(|| id.to_string());
        let path = dest_dir.join(name);

        let (file, partial) = tempfile::Builder::new()
            .prefix(".cloudsync-")
            .suffix(".part")
            .tempfile_in(dest_dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut stream = res.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);
        partial.persist(&path).map_err(|e| e.error)?;

        tracing::info!("saved {} ({} bytes)", path.display(), written);
        Ok(path)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let server = &self.config.server;
        let mut url = Url::parse(server)
            .map_err(|e| Error::Config(format!("invalid server URL {:?}: {}", server, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{:?} cannot be used as a base URL", server)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn unauthorized(&self) -> Error {
        Error::Unauthorized {
            login_url: self.config.login_url(),
        }
    }

    async fn read_reply<T: DeserializeOwned>(&self, res: Response) -> Result<T> {
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.unauthorized());
        }
        let body = res.text().await?;
        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => return Err(Error::Api(describe_failure(status, &body))),
        };
        if let Some(error) = error_message(&value) {
            return Err(Error::Api(error));
        }
        if !status.is_success() {
            return Err(Error::Api(describe_failure(status, &body)));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// The `error` entry of a reply object, unless it is null or empty.
fn error_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, truncate_label(body, 200))
    }
}

/// File name from `Content-Disposition: attachment; filename=...`, reduced to its last
/// path component.
fn attachment_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("filename="))?
        .trim_matches('"');
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}
