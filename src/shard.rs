use std::io::Read;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;

use crate::domain::Item;
use crate::error::FetchError;
use crate::source::{Delivery, ItemStream, RemoteSource, build_client, check_status};

/// Numbered zip shards at a fixed URL prefix (`{base}{NNN}.zip`), one
/// extracted directory per shard. The start offset lets an interrupted
/// corpus download resume partway through the shard range.
pub struct ShardSource {
    client: Client,
    base_url: String,
    dest_root: Utf8PathBuf,
    start: u32,
    shard_count: u32,
}

impl ShardSource {
    pub fn new(
        base_url: impl Into<String>,
        dest_root: Utf8PathBuf,
        start: u32,
        shard_count: u32,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(Duration::from_secs(120))?,
            base_url: base_url.into(),
            dest_root,
            start,
            shard_count,
        })
    }

    fn shard_url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, key)
    }
}

impl RemoteSource for ShardSource {
    fn items(&self, ceiling: Option<u64>) -> ItemStream<'_> {
        let available = u64::from(self.shard_count.saturating_sub(self.start));
        let take = match ceiling {
            Some(limit) => available.min(limit),
            None => available,
        };
        let start = self.start;
        let dest_root = self.dest_root.clone();
        Box::new((0..take).map(move |offset| {
            let shard = start + offset as u32;
            Ok(Item {
                remote_key: format!("{shard:03}.zip"),
                destination_path: dest_root.join(format!("{shard:03}")),
                expected_size: None,
            })
        }))
    }

    fn fetch(&self, item: &Item) -> Result<Box<dyn Read + Send>, FetchError> {
        let url = self.shard_url(&item.remote_key);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        let response = check_status(response)?;
        Ok(Box::new(response))
    }

    fn delivery(&self) -> Delivery {
        Delivery::ZipExtract
    }
}
