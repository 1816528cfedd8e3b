use std::collections::VecDeque;
use std::io::Read;
use std::sync::LazyLock;
use std::time::Duration;

use camino::Utf8PathBuf;
use regex::Regex;
use reqwest::blocking::Client;

use crate::domain::Item;
use crate::error::FetchError;
use crate::source::{Delivery, ItemStream, RemoteSource, build_client, check_status};

static CONTENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Contents>(.*?)</Contents>").unwrap());
static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<Key>([^<]*)</Key>").unwrap());
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<Size>(\d+)</Size>").unwrap());
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<NextContinuationToken>([^<]*)</NextContinuationToken>").unwrap()
});

/// Anonymous object-store prefix listed page by page (`list-type=2` with
/// continuation tokens), one file per key. Listing stops as soon as the
/// requested ceiling is reached, which matters against multi-million-key
/// prefixes.
pub struct BucketSource {
    client: Client,
    bucket_url: String,
    prefix: String,
    dest_root: Utf8PathBuf,
    page_size: u32,
}

#[derive(Debug)]
struct ListingPage {
    objects: Vec<(String, u64)>,
    next_token: Option<String>,
}

impl BucketSource {
    pub fn new(
        bucket_url: impl Into<String>,
        prefix: impl Into<String>,
        dest_root: Utf8PathBuf,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            bucket_url: bucket_url.into().trim_end_matches('/').to_string(),
            prefix: prefix.into(),
            dest_root,
            page_size: 1000,
        })
    }

    fn fetch_page(&self, token: Option<String>) -> Result<ListingPage, FetchError> {
        let mut query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), self.prefix.clone()),
            ("max-keys".to_string(), self.page_size.to_string()),
        ];
        if let Some(token) = token {
            query.push(("continuation-token".to_string(), token));
        }
        let response = self
            .client
            .get(format!("{}/", self.bucket_url))
            .query(&query)
            .send()
            .map_err(|err| FetchError::Enumeration(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Enumeration(format!(
                "listing returned status {}",
                response.status().as_u16()
            )));
        }
        let body = response
            .text()
            .map_err(|err| FetchError::Enumeration(err.to_string()))?;
        Ok(parse_listing(&body))
    }

    fn to_item(&self, key: String, size: u64) -> Item {
        let relative = key
            .strip_prefix(&self.prefix)
            .unwrap_or(&key)
            .trim_start_matches('/');
        Item {
            destination_path: self.dest_root.join(relative),
            remote_key: key,
            expected_size: Some(size),
        }
    }
}

fn parse_listing(xml: &str) -> ListingPage {
    let mut objects = Vec::new();
    for block in CONTENTS_RE.captures_iter(xml) {
        let Some(key) = KEY_RE
            .captures(&block[1])
            .map(|cap| unescape_xml(&cap[1]))
        else {
            continue;
        };
        // directory markers carry no payload
        if key.ends_with('/') {
            continue;
        }
        let size = SIZE_RE
            .captures(&block[1])
            .and_then(|cap| cap[1].parse::<u64>().ok())
            .unwrap_or(0);
        objects.push((key, size));
    }
    let next_token = TOKEN_RE
        .captures(xml)
        .map(|cap| unescape_xml(&cap[1]));
    ListingPage {
        objects,
        next_token,
    }
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

struct BucketIter<'a> {
    source: &'a BucketSource,
    token: Option<String>,
    buffer: VecDeque<Item>,
    remaining: Option<u64>,
    done: bool,
}

impl Iterator for BucketIter<'_> {
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
            match self.source.fetch_page(self.token.take()) {
                Ok(page) => {
                    self.done = page.next_token.is_none();
                    self.token = page.next_token;
                    let source = self.source;
                    self.buffer.extend(
                        page.objects
                            .into_iter()
                            .map(|(key, size)| source.to_item(key, size)),
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

impl RemoteSource for BucketSource {
    fn items(&self, ceiling: Option<u64>) -> ItemStream<'_> {
        Box::new(BucketIter {
            source: self,
            token: None,
            buffer: VecDeque::new(),
            remaining: ceiling,
            done: false,
        })
    }

    fn fetch(&self, item: &Item) -> Result<Box<dyn Read + Send>, FetchError> {
        let url = format!("{}/{}", self.bucket_url, item.remote_key);
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
