use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Item;
use crate::error::FetchError;

/// How a source's payload lands on disk: a plain file at the destination
/// path, or a zip archive extracted into the destination directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    File,
    ZipExtract,
}

pub type ItemStream<'a> = Box<dyn Iterator<Item = Result<Item, FetchError>> + Send + 'a>;

/// One of the remote access patterns (numbered shards, object listing,
/// search API) behind a single seam. Enumeration is lazy and must stop on
/// its own once `ceiling` items have been yielded, so multi-million-key
/// sources are never listed in full.
pub trait RemoteSource: Send + Sync {
    fn items(&self, ceiling: Option<u64>) -> ItemStream<'_>;

    fn fetch(&self, item: &Item) -> Result<Box<dyn Read + Send>, FetchError>;

    fn delivery(&self) -> Delivery;
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("corpus-fetch/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| FetchError::Http(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| FetchError::Http(err.to_string()))
}

pub(crate) fn check_status(response: Response) -> Result<Response, FetchError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "request failed".to_string());
    Err(FetchError::Status { status, message })
}
