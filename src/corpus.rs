use camino::Utf8PathBuf;
use directories::BaseDirs;

use crate::bucket::BucketSource;
use crate::error::FetchError;
use crate::records::RecordSource;
use crate::shard::ShardSource;
use crate::tier::{Tier, TierTable};

pub const GOVDOCS_SHARD_URL: &str =
    "https://downloads.digitalcorpora.org/corpora/files/govdocs1/zipfiles/";
pub const GOVDOCS_SHARDS: u32 = 1000;

pub const DIGITALCORPORA_BUCKET: &str = "https://digitalcorpora.s3.amazonaws.com";
pub const SAFEDOCS_PREFIX: &str = "corpora/files/CC-MAIN-2021-31-PDF-UNTRUNCATED/";
pub const UNSAFEDOCS_PREFIX: &str = "corpora/files/CC-MAIN-2021-31-UNSAFE/";

pub const INVOICES_SEARCH_URL: &str = "https://solr.idl.ucsf.edu/solr/ltdl3/select";
pub const INVOICES_QUERY: &str = "type:invoice AND format:pdf";
pub const INVOICES_FILE_BASE: &str = "https://iiif.idl.ucsf.edu/file";

const GOVDOCS_TIERS: TierTable = TierTable::new(&[
    (Tier::Tiny, 1),
    (Tier::Sample, 10),
    (Tier::Small, 50),
    (Tier::Medium, 100),
    (Tier::Large, 250),
    (Tier::Xlarge, 500),
    (Tier::Complete, 1000),
]);

const SAFEDOCS_TIERS: TierTable = TierTable::new(&[
    (Tier::Tiny, 1_000),
    (Tier::Sample, 10_000),
    (Tier::Small, 50_000),
    (Tier::Medium, 100_000),
    (Tier::Large, 500_000),
    (Tier::Xlarge, 1_000_000),
    (Tier::Xxlarge, 2_000_000),
    (Tier::Complete, 8_000_000),
]);

const UNSAFEDOCS_TIERS: TierTable = TierTable::new(&[
    (Tier::Tiny, 1_000),
    (Tier::Sample, 10_000),
    (Tier::Small, 50_000),
    (Tier::Medium, 100_000),
    (Tier::Large, 500_000),
    (Tier::Xlarge, 1_000_000),
    (Tier::Xxlarge, 2_000_000),
    (Tier::Complete, 5_480_000),
]);

const INVOICES_TIERS: TierTable =
    TierTable::new(&[(Tier::Sample, 50), (Tier::Complete, 1000)]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Govdocs,
    Safedocs,
    Unsafedocs,
    Invoices,
}

impl Corpus {
    pub const ALL: [Corpus; 4] = [
        Corpus::Govdocs,
        Corpus::Safedocs,
        Corpus::Unsafedocs,
        Corpus::Invoices,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Corpus::Govdocs => "govdocs",
            Corpus::Safedocs => "safedocs",
            Corpus::Unsafedocs => "unsafedocs",
            Corpus::Invoices => "invoices",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            Corpus::Govdocs => "GovDocs1",
            Corpus::Safedocs => "SAFEDOCS",
            Corpus::Unsafedocs => "UNSAFE-DOCS",
            Corpus::Invoices => "UCSF-Invoices",
        }
    }

    pub fn tiers(&self) -> TierTable {
        match self {
            Corpus::Govdocs => GOVDOCS_TIERS,
            Corpus::Safedocs => SAFEDOCS_TIERS,
            Corpus::Unsafedocs => UNSAFEDOCS_TIERS,
            Corpus::Invoices => INVOICES_TIERS,
        }
    }
}

/// Default destination root (`~/corpora/<CORPUS>`), resolved once at
/// startup and passed down.
pub fn default_dest_root(corpus: Corpus) -> Result<Utf8PathBuf, FetchError> {
    let dirs = BaseDirs::new()
        .ok_or_else(|| FetchError::Filesystem("unable to resolve home directory".to_string()))?;
    let root = Utf8PathBuf::from_path_buf(dirs.home_dir().join("corpora"))
        .map_err(|_| FetchError::Filesystem("home directory is not valid UTF-8".to_string()))?;
    Ok(root.join(corpus.dir_name()))
}

pub fn govdocs_source(dest_root: Utf8PathBuf, start: u32) -> Result<ShardSource, FetchError> {
    ShardSource::new(GOVDOCS_SHARD_URL, dest_root, start, GOVDOCS_SHARDS)
}

pub fn safedocs_source(dest_root: Utf8PathBuf) -> Result<BucketSource, FetchError> {
    BucketSource::new(DIGITALCORPORA_BUCKET, SAFEDOCS_PREFIX, dest_root)
}

pub fn unsafedocs_source(dest_root: Utf8PathBuf) -> Result<BucketSource, FetchError> {
    BucketSource::new(DIGITALCORPORA_BUCKET, UNSAFEDOCS_PREFIX, dest_root)
}

pub fn invoices_source(dest_root: Utf8PathBuf) -> Result<RecordSource, FetchError> {
    RecordSource::new(
        INVOICES_SEARCH_URL,
        INVOICES_QUERY,
        INVOICES_FILE_BASE,
        dest_root,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_tables_cover_the_full_corpus_at_complete() {
        assert_eq!(Corpus::Govdocs.tiers().ceiling(Tier::Complete), Some(1000));
        assert_eq!(
            Corpus::Safedocs.tiers().ceiling(Tier::Complete),
            Some(8_000_000)
        );
        assert_eq!(
            Corpus::Unsafedocs.tiers().ceiling(Tier::Complete),
            Some(5_480_000)
        );
    }

    #[test]
    fn govdocs_has_no_xxlarge_tier() {
        assert_eq!(Corpus::Govdocs.tiers().ceiling(Tier::Xxlarge), None);
    }

    #[test]
    fn default_roots_are_per_corpus() {
        let govdocs = default_dest_root(Corpus::Govdocs).unwrap();
        let safedocs = default_dest_root(Corpus::Safedocs).unwrap();

        assert!(govdocs.ends_with("corpora/GovDocs1"));
        assert!(safedocs.ends_with("corpora/SAFEDOCS"));
    }
}
