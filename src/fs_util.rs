use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::FetchError;

/// Extract every entry of a zip archive into `target_dir`, returning the
/// number of files written.
pub fn extract_zip<R: Read + Seek>(reader: R, target_dir: &Path) -> Result<usize, FetchError> {
    let mut archive = ZipArchive::new(reader).map_err(|err| FetchError::Archive(err.to_string()))?;

    let mut extracted = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| FetchError::Archive(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(FetchError::Archive(
                "zip entry path traversal detected".to_string(),
            ));
        };
        let entry_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| FetchError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            File::create(&entry_path).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        extracted += 1;
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use assert_matches::assert_matches;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn archive_with(names: &[&str]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in names {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"content").unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn extracts_entries_and_counts_files() {
        let temp = tempfile::tempdir().unwrap();
        let count = extract_zip(archive_with(&["a.txt", "sub/b.txt"]), temp.path()).unwrap();

        assert_eq!(count, 2);
        assert!(temp.path().join("a.txt").is_file());
        assert!(temp.path().join("sub/b.txt").is_file());
    }

    #[test]
    fn rejects_traversal_entries() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract_zip(archive_with(&["../evil.txt"]), temp.path()).unwrap_err();
        assert_matches!(err, FetchError::Archive(_));
    }

    #[test]
    fn garbage_bytes_are_an_archive_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract_zip(Cursor::new(b"not a zip".to_vec()), temp.path()).unwrap_err();
        assert_matches!(err, FetchError::Archive(_));
    }
}
