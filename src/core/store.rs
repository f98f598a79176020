// Document collection keyed by `summaryID`: in-memory and JSON Lines file backends.
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::core::record::Summary;

/// Read predicate over a collection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter<'a> {
    All,
    Id(&'a str),
    /// Case-insensitive substring of the original text.
    TextFragment(&'a str),
    Timestamp(&'a str),
    /// Exact match against one element of the keyword list.
    Keyword(&'a str),
    /// Inclusive on both ends.
    RatingRange { min: f64, max: f64 },
}

impl Filter<'_> {
    pub fn matches(&self, record: &Summary) -> bool {
        match *self {
            Filter::All => true,
            Filter::Id(id) => record.summary_id == id,
            Filter::TextFragment(fragment) => record
                .original_text
                .to_lowercase()
                .contains(&fragment.to_lowercase()),
            Filter::Timestamp(ts) => record.timestamp == ts,
            Filter::Keyword(keyword) => record.keywords.iter().any(|k| k == keyword),
            Filter::RatingRange { min, max } => record.rating >= min && record.rating <= max,
        }
    }
}

/// Storage contract behind the query surface.
///
/// Implementations guarantee that a colliding insert fails with
/// `AlreadyExists` and leaves existing data alone, that a replace is never
/// visible half-applied, and that deleting an unknown id is `Ok(false)`.
pub trait DocumentStore: Send + Sync {
    fn insert(&self, record: Summary) -> Result<Summary, Error>;

    /// Matching records in storage order.
    fn find(&self, filter: &Filter<'_>) -> Result<Vec<Summary>, Error>;

    /// Replaces the record stored under `id`. `record.summary_id` must equal `id`.
    fn replace(&self, id: &str, record: Summary) -> Result<Option<Summary>, Error>;

    fn delete(&self, id: &str) -> Result<bool, Error>;
}

fn duplicate_id(id: &str) -> Error {
    Error::new(ErrorKind::AlreadyExists)
        .with_message("summary id already exists")
        .with_id(id)
        .with_hint("Pick a different summaryID or replace the existing record.")
}

fn insert_unique(records: &mut Vec<Summary>, record: Summary) -> Result<Summary, Error> {
    if records.iter().any(|r| r.summary_id == record.summary_id) {
        return Err(duplicate_id(&record.summary_id));
    }
    records.push(record.clone());
    Ok(record)
}

fn replace_in(records: &mut [Summary], id: &str, record: Summary) -> Option<Summary> {
    let slot = records.iter_mut().find(|r| r.summary_id == id)?;
    *slot = record.clone();
    Some(record)
}

fn delete_from(records: &mut Vec<Summary>, id: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.summary_id != id);
    records.len() != before
}

#[derive(Debug, Default)]
pub struct MemoryCollection {
    records: RwLock<Vec<Summary>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryCollection {
    fn insert(&self, record: Summary) -> Result<Summary, Error> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        insert_unique(&mut records, record)
    }

    fn find(&self, filter: &Filter<'_>) -> Result<Vec<Summary>, Error> {
        let records = self
            .records
            .read()
            .unwrap_or_else(|poison| poison.into_inner());
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn replace(&self, id: &str, record: Summary) -> Result<Option<Summary>, Error> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        Ok(replace_in(&mut records, id, record))
    }

    fn delete(&self, id: &str) -> Result<bool, Error> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        Ok(delete_from(&mut records, id))
    }
}

/// One record per line. Writers hold an exclusive lock on `<file>.lock`,
/// write the whole collection to a temp sibling and rename it into place.
#[derive(Clone, Debug)]
pub struct FileCollection {
    path: PathBuf,
    lock_path: PathBuf,
    tmp_path: PathBuf,
}

impl FileCollection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage).with_message("collection path must name a file")
            })?
            .to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| io_error(err, "failed to create collection directory"))?;
        }
        let lock_path = path.with_file_name(format!("{file_name}.lock"));
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
        Ok(Self {
            path,
            lock_path,
            tmp_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self, exclusive: bool) -> Result<CollectionLock, Error> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|err| io_error(err, "failed to open collection lock"))?;
        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock collection")
                .with_source(err)
        })?;
        Ok(CollectionLock { file })
    }

    fn load(&self) -> Result<Vec<Summary>, Error> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err, "failed to open collection")),
        };
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| io_error(err, "failed to read collection"))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Summary = serde_json::from_str(&line).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message("invalid record json")
                    .with_line(index as u64 + 1)
                    .with_source(err)
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn persist(&self, records: &[Summary]) -> Result<(), Error> {
        let mut out = Vec::new();
        for record in records {
            serde_json::to_writer(&mut out, record).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode record")
                    .with_id(&record.summary_id)
                    .with_source(err)
            })?;
            out.push(b'\n');
        }
        let mut tmp = File::create(&self.tmp_path)
            .map_err(|err| io_error(err, "failed to create collection temp file"))?;
        tmp.write_all(&out)
            .and_then(|()| tmp.sync_all())
            .map_err(|err| io_error(err, "failed to write collection"))?;
        std::fs::rename(&self.tmp_path, &self.path)
            .map_err(|err| io_error(err, "failed to replace collection"))
    }

    // `apply` returns its result plus whether the collection changed.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Vec<Summary>) -> Result<(T, bool), Error>,
    ) -> Result<T, Error> {
        let _lock = self.lock(true)?;
        let mut records = self.load()?;
        let (out, changed) = apply(&mut records)?;
        if changed {
            self.persist(&records)?;
        }
        Ok(out)
    }
}

impl DocumentStore for FileCollection {
    fn insert(&self, record: Summary) -> Result<Summary, Error> {
        self.mutate(|records| Ok((insert_unique(records, record)?, true)))
    }

    fn find(&self, filter: &Filter<'_>) -> Result<Vec<Summary>, Error> {
        let _lock = self.lock(false)?;
        let mut records = self.load()?;
        records.retain(|r| filter.matches(r));
        Ok(records)
    }

    fn replace(&self, id: &str, record: Summary) -> Result<Option<Summary>, Error> {
        self.mutate(|records| {
            let replaced = replace_in(records, id, record);
            let changed = replaced.is_some();
            Ok((replaced, changed))
        })
    }

    fn delete(&self, id: &str) -> Result<bool, Error> {
        self.mutate(|records| {
            let deleted = delete_from(records, id);
            Ok((deleted, deleted))
        })
    }
}

struct CollectionLock {
    file: File,
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn io_error(err: io::Error, message: &str) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    };
    Error::new(kind).with_message(message).with_source(err)
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

/// Opens the collection a store URI points at.
///
/// `memory:` keeps records in process; `file:///abs/path.jsonl` or a bare
/// filesystem path uses a JSON Lines file.
pub fn open_store(uri: &str) -> Result<Arc<dyn DocumentStore>, Error> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("store uri is empty")
            .with_hint("Use memory: or a path like ./summaries.jsonl."));
    }
    if trimmed == "memory:" || trimmed == "memory://" {
        return Ok(Arc::new(MemoryCollection::new()));
    }
    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| {
                Error::new(ErrorKind::Usage).with_message("file store uri must be an absolute path")
            })?;
            Ok(Arc::new(FileCollection::open(path)?))
        }
        // Single-letter schemes are Windows drive prefixes, not URIs.
        Ok(url) if url.scheme().len() > 1 => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported store uri scheme: {}", url.scheme()))
            .with_hint("Use memory:, file:///path, or a plain path.")),
        _ => Ok(Arc::new(FileCollection::open(trimmed)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentStore, FileCollection, Filter, MemoryCollection, open_store};
    use crate::core::error::ErrorKind;
    use crate::core::record::{Summary, SummaryInput};

    fn record(id: &str, rating: f64, keywords: &[&str]) -> Summary {
        SummaryInput {
            summary_id: id.to_string(),
            original_text: format!("The Original text of {id}"),
            summary: "short".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            rating,
            word_count: 5,
        }
        .stamp(format!("2026-03-01T10:00:0{}Z", rating as u32))
    }

    fn exercise(store: &dyn DocumentStore) {
        store.insert(record("a", 2.0, &["x", "y"])).expect("insert a");
        store.insert(record("b", 3.0, &["y"])).expect("insert b");
        store.insert(record("c", 4.0, &["z"])).expect("insert c");

        let err = store
            .insert(record("a", 5.0, &["dup"]))
            .expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.id(), Some("a"));
        let a = store.find(&Filter::Id("a")).expect("find a");
        assert_eq!(a[0].rating, 2.0);

        let in_range = store
            .find(&Filter::RatingRange { min: 1.0, max: 3.0 })
            .expect("range");
        let ids: Vec<_> = in_range.iter().map(|r| r.summary_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        let tagged = store.find(&Filter::Keyword("y")).expect("keyword");
        assert_eq!(tagged.len(), 2);
        assert!(store.find(&Filter::Keyword("Y")).expect("keyword").is_empty());

        let text = store.find(&Filter::TextFragment("original TEXT of b")).expect("text");
        assert_eq!(text.len(), 1);

        let mut replacement = record("b", 1.5, &["new"]);
        replacement.summary = "rewritten".to_string();
        let replaced = store.replace("b", replacement).expect("replace");
        assert_eq!(replaced.map(|r| r.summary), Some("rewritten".to_string()));
        assert!(store.replace("missing", record("missing", 1.0, &["k"])).expect("replace").is_none());

        assert!(store.delete("c").expect("delete"));
        assert!(!store.delete("c").expect("delete again"));
        assert_eq!(store.find(&Filter::All).expect("all").len(), 2);
    }

    #[test]
    fn memory_collection_honors_store_contract() {
        exercise(&MemoryCollection::new());
    }

    #[test]
    fn file_collection_honors_store_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCollection::open(dir.path().join("nested/summaries.jsonl")).expect("open");
        exercise(&store);

        let reopened = FileCollection::open(store.path()).expect("reopen");
        let all = reopened.find(&Filter::All).expect("all");
        let ids: Vec<_> = all.iter().map(|r| r.summary_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn file_collection_reports_corrupt_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("summaries.jsonl");
        let good = serde_json::to_string(&record("a", 2.0, &["x"])).expect("json");
        std::fs::write(&path, format!("{good}\n\n{{not json\n")).expect("write");

        let store = FileCollection::open(&path).expect("open");
        let err = store.find(&Filter::All).expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn open_store_resolves_uris() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("s.jsonl");

        let memory = open_store("memory:").expect("memory");
        memory.insert(record("m", 3.0, &["k"])).expect("insert");
        assert_eq!(memory.find(&Filter::All).expect("all").len(), 1);

        let uri = url::Url::from_file_path(&path).expect("file url");
        let file = open_store(uri.as_str()).expect("file uri");
        file.insert(record("f", 3.0, &["k"])).expect("insert");
        let plain = open_store(path.to_str().expect("utf8")).expect("plain path");
        assert_eq!(plain.find(&Filter::Id("f")).expect("find").len(), 1);

        let err = open_store("mongodb://127.0.0.1:27017/db").err().expect("unsupported");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = open_store("  ").err().expect("empty");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn lock_errors_map_to_expected_kinds() {
        let err = std::io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(super::lock_error_kind(&err), ErrorKind::Permission);

        let err = std::io::Error::from_raw_os_error(libc::EPERM);
        assert_eq!(super::lock_error_kind(&err), ErrorKind::Permission);

        let err = std::io::Error::from_raw_os_error(libc::EBADF);
        assert_eq!(super::lock_error_kind(&err), ErrorKind::Io);
    }
}
