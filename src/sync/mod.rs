//! Remote store boundary.
//!
//! The core only knows named byte blobs: a quote is stored as
//! `<quote name>.json` and each renamed picture under its file name. How the
//! bytes travel is up to the [`RemoteStore`] implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{NestQuoteError, NestQuoteResult};
use crate::model::Quote;

/// Fetch and store named blobs.
pub trait RemoteStore {
    fn fetch(&self, name: &str) -> NestQuoteResult<Vec<u8>>;
    fn store(&self, name: &str, bytes: &[u8]) -> NestQuoteResult<()>;
}

// ── Local directory ──────────────────────────────────────────────────────

/// A store backed by a local folder, one file per blob.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> NestQuoteResult<PathBuf> {
        let relative = Path::new(name);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(NestQuoteError::Remote {
                name: name.to_string(),
                reason: "blob names must stay inside the store".into(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl RemoteStore for DirectoryStore {
    fn fetch(&self, name: &str) -> NestQuoteResult<Vec<u8>> {
        let path = self.path_for(name)?;
        std::fs::read(&path).map_err(|source| NestQuoteError::Io { path, source })
    }

    fn store(&self, name: &str, bytes: &[u8]) -> NestQuoteResult<()> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| NestQuoteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, bytes).map_err(|source| NestQuoteError::Io { path, source })
    }
}

// ── HTTP ─────────────────────────────────────────────────────────────────

/// A store reached over HTTP: `GET <base>/<name>` and `POST <base>/<name>`.
///
/// The client is blocking. From async code, go through [`upload_over_http`]
/// or wrap the calls in `spawn_blocking`.
pub struct HttpStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> NestQuoteResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NestQuoteError::Remote {
                name: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { base_url, client })
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }
}

fn remote_error(name: &str, e: reqwest::Error) -> NestQuoteError {
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    NestQuoteError::Remote {
        name: name.to_string(),
        reason,
    }
}

impl RemoteStore for HttpStore {
    fn fetch(&self, name: &str) -> NestQuoteResult<Vec<u8>> {
        let url = self.url_for(name);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| remote_error(name, e))?;
        if !response.status().is_success() {
            return Err(NestQuoteError::Remote {
                name: name.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let bytes = response.bytes().map_err(|e| remote_error(name, e))?;
        Ok(bytes.to_vec())
    }

    fn store(&self, name: &str, bytes: &[u8]) -> NestQuoteResult<()> {
        let url = self.url_for(name);
        debug!("POST {} ({} bytes)", url, bytes.len());
        let response = self
            .client
            .post(&url)
            .body(bytes.to_vec())
            .send()
            .map_err(|e| remote_error(name, e))?;
        if !response.status().is_success() {
            return Err(NestQuoteError::Remote {
                name: name.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Blob name a quote is stored under.
pub fn quote_blob_name(quote_name: &str) -> String {
    format!("{quote_name}.json")
}

/// Store a quote as JSON. Clears the quote's unsaved-changes flag.
pub fn upload_quote(store: &dyn RemoteStore, quote: &mut Quote) -> NestQuoteResult<()> {
    let name = quote_blob_name(quote.name());
    let json = quote.to_json()?;
    store.store(&name, json.as_bytes())?;
    info!("Uploaded quote '{}'", name);
    Ok(())
}

pub fn download_quote(store: &dyn RemoteStore, quote_name: &str) -> NestQuoteResult<Quote> {
    let name = quote_blob_name(quote_name);
    let bytes = store.fetch(&name)?;
    let json = String::from_utf8(bytes).map_err(|e| NestQuoteError::Remote {
        name,
        reason: e.to_string(),
    })?;
    Quote::from_json(&json)
}

/// Store each picture under its file name. Returns the number uploaded.
pub fn upload_images(store: &dyn RemoteStore, images: &[PathBuf]) -> NestQuoteResult<usize> {
    let mut uploaded = 0;
    for path in images {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let bytes = std::fs::read(path).map_err(|source| NestQuoteError::Io {
            path: path.clone(),
            source,
        })?;
        store.store(&name, &bytes)?;
        uploaded += 1;
    }
    info!("Uploaded {} image(s)", uploaded);
    Ok(uploaded)
}

/// Upload pictures, then the quote, to an HTTP store from async code.
///
/// The store is built and used on tokio's blocking pool. Returns the quote
/// (marked saved) and the number of pictures uploaded.
pub async fn upload_over_http(
    base_url: String,
    timeout_secs: u64,
    mut quote: Quote,
    images: Vec<PathBuf>,
) -> NestQuoteResult<(Quote, usize)> {
    tokio::task::spawn_blocking(move || {
        let store = HttpStore::new(base_url, timeout_secs)?;
        let uploaded = upload_images(&store, &images)?;
        upload_quote(&store, &mut quote)?;
        Ok((quote, uploaded))
    })
    .await
    .map_err(|e| NestQuoteError::Internal(format!("Upload task panicked: {e}")))?
}
