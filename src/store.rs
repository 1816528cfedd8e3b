use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::Item;
use crate::error::FetchError;
use crate::fs_util;
use crate::source::Delivery;

/// Marker written into an extracted archive directory as the last step
/// before it is renamed into place. Its presence is the only signal that
/// the archive landed completely; a directory without it is treated as a
/// leftover from an interrupted run.
pub const MARKER_FILE: &str = ".corpus-fetch.json";

pub trait LocalStore: Send + Sync {
    fn is_present(&self, item: &Item, delivery: Delivery) -> bool;

    fn store(
        &self,
        item: &Item,
        delivery: Delivery,
        body: &mut dyn Read,
    ) -> Result<(), FetchError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveMarker {
    pub remote_key: String,
    pub entries: usize,
    pub completed_at: String,
    pub tool: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl DiskStore {
    pub fn new() -> Self {
        Self
    }

    fn file_present(path: &Utf8Path) -> bool {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    fn archive_present(dir: &Utf8Path) -> bool {
        dir.join(MARKER_FILE).as_std_path().is_file()
    }

    fn write_file(path: &Utf8Path, body: &mut dyn Read) -> Result<(), FetchError> {
        let parent = path
            .parent()
            .ok_or_else(|| FetchError::Filesystem(format!("destination has no parent: {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".corpus-fetch-part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        io::copy(body, temp.as_file_mut())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn extract_archive(item: &Item, body: &mut dyn Read) -> Result<(), FetchError> {
        let dest = &item.destination_path;
        let parent = dest
            .parent()
            .ok_or_else(|| FetchError::Filesystem(format!("destination has no parent: {dest}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;

        // the zip reader needs a seekable source, so spool the body first
        let mut spool =
            tempfile::tempfile().map_err(|err| FetchError::Filesystem(err.to_string()))?;
        io::copy(body, &mut spool).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        spool
            .seek(SeekFrom::Start(0))
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;

        let staging = tempfile::Builder::new()
            .prefix(".corpus-fetch-extract")
            .tempdir_in(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let entries = fs_util::extract_zip(spool, staging.path())?;

        let marker = ArchiveMarker {
            remote_key: item.remote_key.clone(),
            entries,
            completed_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("corpus-fetch/{}", env!("CARGO_PKG_VERSION")),
        };
        let content = serde_json::to_vec_pretty(&marker)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        fs::write(staging.path().join(MARKER_FILE), &content)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;

        atomic_rename_dir(staging.path(), dest.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl LocalStore for DiskStore {
    fn is_present(&self, item: &Item, delivery: Delivery) -> bool {
        match delivery {
            Delivery::File => Self::file_present(&item.destination_path),
            Delivery::ZipExtract => Self::archive_present(&item.destination_path),
        }
    }

    fn store(
        &self,
        item: &Item,
        delivery: Delivery,
        body: &mut dyn Read,
    ) -> Result<(), FetchError> {
        match delivery {
            Delivery::File => Self::write_file(&item.destination_path, body),
            Delivery::ZipExtract => Self::extract_archive(item, body),
        }
    }
}

pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}
