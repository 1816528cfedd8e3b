use std::io::{Cursor, Write};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use corpus_fetch::domain::Item;
use corpus_fetch::error::FetchError;
use corpus_fetch::source::Delivery;
use corpus_fetch::store::{ArchiveMarker, DiskStore, LocalStore, MARKER_FILE};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn sandbox() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn file_item(dest: Utf8PathBuf) -> Item {
    Item {
        remote_key: "corpora/files/demo/a.pdf".to_string(),
        destination_path: dest,
        expected_size: None,
    }
}

fn archive_bytes(names: &[&str]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for name in names {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"content").unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn file_write_is_atomic_and_creates_parents() {
    let (_temp, root) = sandbox();
    let item = file_item(root.join("sub/dir/a.pdf"));
    let store = DiskStore::new();

    assert!(!store.is_present(&item, Delivery::File));
    store
        .store(&item, Delivery::File, &mut Cursor::new(b"pdf bytes".to_vec()))
        .unwrap();

    assert!(store.is_present(&item, Delivery::File));
    let written = std::fs::read(item.destination_path.as_std_path()).unwrap();
    assert_eq!(written, b"pdf bytes");
}

#[test]
fn an_empty_file_does_not_count_as_present() {
    let (_temp, root) = sandbox();
    let item = file_item(root.join("a.pdf"));
    std::fs::File::create(item.destination_path.as_std_path()).unwrap();

    assert!(!DiskStore::new().is_present(&item, Delivery::File));
}

#[test]
fn extraction_writes_files_and_the_completion_marker() {
    let (_temp, root) = sandbox();
    let item = Item {
        remote_key: "000.zip".to_string(),
        destination_path: root.join("000"),
        expected_size: None,
    };
    let store = DiskStore::new();

    store
        .store(
            &item,
            Delivery::ZipExtract,
            &mut Cursor::new(archive_bytes(&["a.txt", "nested/b.txt"])),
        )
        .unwrap();

    assert!(item.destination_path.join("a.txt").as_std_path().is_file());
    assert!(
        item.destination_path
            .join("nested/b.txt")
            .as_std_path()
            .is_file()
    );
    assert!(store.is_present(&item, Delivery::ZipExtract));

    let marker_raw =
        std::fs::read_to_string(item.destination_path.join(MARKER_FILE).as_std_path()).unwrap();
    let marker: ArchiveMarker = serde_json::from_str(&marker_raw).unwrap();
    assert_eq!(marker.remote_key, "000.zip");
    assert_eq!(marker.entries, 2);
}

#[test]
fn a_partial_extraction_is_not_present_and_gets_replaced() {
    let (_temp, root) = sandbox();
    let item = Item {
        remote_key: "000.zip".to_string(),
        destination_path: root.join("000"),
        expected_size: None,
    };
    let store = DiskStore::new();

    // directory from an interrupted run: files present, no marker
    std::fs::create_dir_all(item.destination_path.as_std_path()).unwrap();
    std::fs::write(item.destination_path.join("stale.txt").as_std_path(), b"x").unwrap();
    assert!(!store.is_present(&item, Delivery::ZipExtract));

    store
        .store(
            &item,
            Delivery::ZipExtract,
            &mut Cursor::new(archive_bytes(&["fresh.txt"])),
        )
        .unwrap();

    assert!(store.is_present(&item, Delivery::ZipExtract));
    assert!(
        !item
            .destination_path
            .join("stale.txt")
            .as_std_path()
            .exists()
    );
    assert!(
        item.destination_path
            .join("fresh.txt")
            .as_std_path()
            .is_file()
    );
}

#[test]
fn a_corrupt_archive_fails_and_leaves_no_destination() {
    let (_temp, root) = sandbox();
    let item = Item {
        remote_key: "000.zip".to_string(),
        destination_path: root.join("000"),
        expected_size: None,
    };
    let store = DiskStore::new();

    let err = store
        .store(
            &item,
            Delivery::ZipExtract,
            &mut Cursor::new(b"not an archive".to_vec()),
        )
        .unwrap_err();

    assert_matches!(err, FetchError::Archive(_));
    assert!(!item.destination_path.as_std_path().exists());
    assert!(!store.is_present(&item, Delivery::ZipExtract));
}
