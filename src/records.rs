use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::Item;
use crate::error::FetchError;
use crate::source::{Delivery, ItemStream, RemoteSource, build_client, check_status};

/// Paginated search endpoint returning JSON records, each naming one
/// downloadable document. The download URL is derived from the record id
/// against a fixed file-server base.
pub struct RecordSource {
    client: Client,
    search_url: String,
    query: String,
    file_base: String,
    dest_root: Utf8PathBuf,
    page_size: u32,
}

#[derive(Debug)]
struct RecordPage {
    records: Vec<(String, Option<u64>)>,
    total: u64,
}

impl RecordSource {
    pub fn new(
        search_url: impl Into<String>,
        query: impl Into<String>,
        file_base: impl Into<String>,
        dest_root: Utf8PathBuf,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            search_url: search_url.into(),
            query: query.into(),
            file_base: file_base.into().trim_end_matches('/').to_string(),
            dest_root,
            page_size: 100,
        })
    }

    fn fetch_page(&self, offset: u64) -> Result<RecordPage, FetchError> {
        let query = [
            ("q", self.query.clone()),
            ("wt", "json".to_string()),
            ("rows", self.page_size.to_string()),
            ("start", offset.to_string()),
            ("fl", "id,file_size".to_string()),
        ];
        let response = self
            .client
            .get(&self.search_url)
            .query(&query)
            .send()
            .map_err(|err| FetchError::Enumeration(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Enumeration(format!(
                "search returned status {}",
                response.status().as_u16()
            )));
        }
        let body: Value = response
            .json()
            .map_err(|err| FetchError::Enumeration(err.to_string()))?;
        parse_page(&body)
    }

    fn to_item(&self, id: String, size: Option<u64>) -> Item {
        Item {
            destination_path: self.dest_root.join(format!("{id}.pdf")),
            remote_key: id,
            expected_size: size,
        }
    }

    fn download_url(&self, id: &str) -> String {
        format!("{}/{id}/{id}.pdf", self.file_base)
    }
}

fn parse_page(body: &Value) -> Result<RecordPage, FetchError> {
    let response = body
        .get("response")
        .ok_or_else(|| FetchError::Enumeration("malformed search response: no `response`".to_string()))?;
    let total = response
        .get("numFound")
        .and_then(|value| value.as_u64())
        .unwrap_or(0);
    let docs = response
        .get("docs")
        .and_then(|value| value.as_array())
        .ok_or_else(|| FetchError::Enumeration("malformed search response: no `docs`".to_string()))?;

    let mut records = Vec::new();
    for doc in docs {
        let Some(id) = doc.get("id").and_then(|value| value.as_str()) else {
            continue;
        };
        let size = doc.get("file_size").and_then(|value| value.as_u64());
        records.push((id.to_string(), size));
    }
    Ok(RecordPage { records, total })
}

struct RecordIter<'a> {
    source: &'a RecordSource,
    offset: u64,
    buffer: VecDeque<Item>,
    remaining: Option<u64>,
    done: bool,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Item, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }
            if let Some(item) = self.buffer.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.source.fetch_page(self.offset) {
                Ok(page) => {
                    self.offset += page.records.len() as u64;
                    if page.records.is_empty() || self.offset >= page.total {
                        self.done = true;
                    }
                    let source = self.source;
                    self.buffer.extend(
                        page.records
                            .into_iter()
                            .map(|(id, size)| source.to_item(id, size)),
                    );
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl RemoteSource for RecordSource {
    fn items(&self, ceiling: Option<u64>) -> ItemStream<'_> {
        Box::new(RecordIter {
            source: self,
            offset: 0,
            buffer: VecDeque::new(),
            remaining: ceiling,
            done: false,
        })
    }

    fn fetch(&self, item: &Item) -> Result<Box<dyn Read + Send>, FetchError> {
        let url = self.download_url(&item.remote_key);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        let response = check_status(response)?;
        Ok(Box::new(response))
    }

    fn delivery(&self) -> Delivery {
        Delivery::File
    }
}
