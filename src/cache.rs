/// JSON cache files for fetched collections
///
/// One file per named collection, holding a flat JSON array of records. The
/// file's modification time is the only freshness signal.
use crate::clock::Clock;
use crate::{CatalogError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Name suffixes of the catalog's cache files; anything else in the directory is left alone
pub const SUMMARY_SUFFIX: &str = "_videos";
pub const DETAIL_SUFFIX: &str = "_details";
pub const CHANNEL_SUFFIX: &str = "_channels";

/// Whether `name` (file stem) belongs to the catalog
pub fn is_catalog_cache(name: &str) -> bool {
    [SUMMARY_SUFFIX, DETAIL_SUFFIX, CHANNEL_SUFFIX]
        .iter()
        .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}

/// Contents of a cache file together with its age
#[derive(Debug, Clone)]
pub struct CachedCollection<T> {
    pub records: Vec<T>,
    /// Time since the last write; `None` when the file does not exist,
    /// which counts as infinitely stale
    pub age: Option<Duration>,
}

impl<T> CachedCollection<T> {
    pub fn missing() -> Self {
        Self {
            records: Vec::new(),
            age: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.age.is_some()
    }
}

/// Manages cache files in a single directory
#[derive(Clone)]
pub struct CacheStore {
    /// Cache directory path
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create a new cache store
    pub fn new(cache_dir: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { cache_dir, clock }
    }

    /// Initialize cache directory
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        debug!("📁 Cache directory initialized: {}", self.cache_dir.display());
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// File backing the named collection
    pub fn path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    /// Age of the named cache, `None` if it does not exist
    pub fn age(&self, name: &str) -> Result<Option<Duration>> {
        self.age_of(&self.path(name))
    }

    fn age_of(&self, path: &Path) -> Result<Option<Duration>> {
        let modified = match std::fs::metadata(path) {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let written: chrono::DateTime<chrono::Utc> = modified.into();
        // A write stamped in the future (clock skew) counts as brand new
        let age = (self.clock.now() - written).to_std().unwrap_or(Duration::ZERO);
        Ok(Some(age))
    }

    /// Load the named collection and its age.
    ///
    /// A missing file yields an empty, infinitely stale collection. An
    /// unreadable or malformed file is an error; it is never reset to empty.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<CachedCollection<T>> {
        let path = self.path(name);
        let Some(age) = self.age_of(&path)? else {
            debug!("Cache miss: no file found for {}", name);
            return Ok(CachedCollection::missing());
        };

        let content = std::fs::read_to_string(&path)?;
        let records: Vec<T> = serde_json::from_str(&content)
            .map_err(|source| CatalogError::CacheCorrupt { path: path.clone(), source })?;

        debug!(
            "📚 Loaded {} records from {} ({}s old)",
            records.len(),
            path.display(),
            age.as_secs()
        );
        Ok(CachedCollection {
            records,
            age: Some(age),
        })
    }

    /// Replace the named collection on disk.
    ///
    /// Writes a temporary file next to the target and renames it into place,
    /// so a crash mid-write leaves the previous contents intact.
    pub fn save<T: Serialize>(&self, name: &str, records: &[T]) -> Result<()> {
        self.initialize()?;
        let path = self.path(name);

        let tmp = NamedTempFile::new_in(&self.cache_dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| CatalogError::Io(e.error))?;

        info!("💾 Saved {} records to cache: {}", records.len(), path.display());
        Ok(())
    }

    /// Remove the named cache file; returns whether it existed
    pub fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("🗑️ Removed cache file: {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache file not found: {}", path.display());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Describe every catalog cache file in the directory, oldest first
    pub fn list_entries(&self, freshness: Duration) -> Result<Vec<CacheEntryInfo>> {
        let mut entries = Vec::new();
        let dir = match std::fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        for entry in dir {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(name) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
                continue;
            };
            if !is_catalog_cache(&name) {
                continue;
            }
            let Some(age) = self.age_of(&path)? else {
                continue;
            };

            // Damaged caches are listed without a record count
            let record_count = std::fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<Vec<serde_json::Value>>(&content).ok())
                .map(|records| records.len());

            entries.push(CacheEntryInfo {
                name,
                path,
                record_count,
                age,
                is_fresh: age <= freshness,
            });
        }

        entries.sort_by(|a, b| b.age.cmp(&a.age));
        Ok(entries)
    }

    /// Get cache statistics
    pub fn stats(&self, freshness: Duration) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for entry in self.list_entries(freshness)? {
            stats.total_files += 1;
            if entry.is_fresh {
                stats.fresh_files += 1;
            } else {
                stats.stale_files += 1;
            }
            match entry.record_count {
                Some(count) => stats.total_records += count,
                None => stats.unreadable_files += 1,
            }
        }
        Ok(stats)
    }

    /// Delete every catalog cache file (nuclear option)
    pub fn clear_all(&self) -> Result<usize> {
        let mut cleared = 0;
        for entry in self.list_entries(Duration::MAX)? {
            std::fs::remove_file(&entry.path)?;
            cleared += 1;
            debug!("🗑️ Removed cache file: {}", entry.path.display());
        }

        if cleared > 0 {
            info!("🧹 Cleared {} cache files", cleared);
        }
        Ok(cleared)
    }
}

/// Cache statistics
#[derive(Debug, Default, PartialEq)]
pub struct CacheStats {
    pub total_files: usize,
    pub fresh_files: usize,
    pub stale_files: usize,
    pub unreadable_files: usize,
    pub total_records: usize,
}

/// Information about a cache file
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub record_count: Option<usize>,
    pub age: Duration,
    pub is_fresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SystemClock};
    use chrono::Utc;
    use serde::Deserialize;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        id: String,
    }

    fn record(id: &str) -> Record {
        Record { id: id.to_string() }
    }

    fn store(dir: &TempDir) -> CacheStore {
        CacheStore::new(dir.path().to_path_buf(), Arc::new(SystemClock))
    }

    fn backdate(path: &Path, by: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_missing_cache_is_infinitely_stale() {
        let temp_dir = TempDir::new().unwrap();
        let loaded: CachedCollection<Record> = store(&temp_dir).load("absent").unwrap();
        assert!(!loaded.exists());
        assert!(loaded.records.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store.save("demo_videos", &[record("a"), record("b")]).unwrap();
        let loaded: CachedCollection<Record> = store.load("demo_videos").unwrap();

        assert_eq!(loaded.records, vec![record("a"), record("b")]);
        assert!(loaded.age.unwrap() < Duration::from_secs(60));
        assert_eq!(store.path("demo_videos"), temp_dir.path().join("demo_videos.json"));
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("one", &[record("a")]).unwrap();
        store.save("one", &[record("b")]).unwrap();

        let files: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        std::fs::write(store.path("broken"), "{not json").unwrap();

        let err = store.load::<Record>("broken").unwrap_err();
        assert!(matches!(err, CatalogError::CacheCorrupt { .. }));
        // The damaged file is left in place
        assert!(store.path("broken").exists());
    }

    #[test]
    fn test_age_follows_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("old", &[record("a")]).unwrap();
        backdate(&store.path("old"), Duration::from_secs(3 * 3600));

        let age = store.age("old").unwrap().unwrap();
        assert!(age >= Duration::from_secs(3 * 3600));
        assert!(age < Duration::from_secs(3 * 3600 + 60));
    }

    #[test]
    fn test_future_modification_time_counts_as_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let past = Utc::now() - chrono::Duration::days(1);
        let store = CacheStore::new(temp_dir.path().to_path_buf(), Arc::new(FixedClock(past)));
        store.save("skewed", &[record("a")]).unwrap();

        assert_eq!(store.age("skewed").unwrap(), Some(Duration::ZERO));
    }

    #[test]
    fn test_list_stats_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("fresh_videos", &[record("a"), record("b")]).unwrap();
        store.save("stale_details", &[record("c")]).unwrap();
        backdate(&store.path("stale_details"), Duration::from_secs(48 * 3600));
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        // Unrelated JSON sharing the directory
        std::fs::write(temp_dir.path().join("package.json"), "{\"name\": \"web\"}").unwrap();
        std::fs::write(temp_dir.path().join("tags.json"), "[1, 2, 3]").unwrap();

        let freshness = Duration::from_secs(24 * 3600);
        let entries = store.list_entries(freshness).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "stale_details");
        assert!(!entries[0].is_fresh);
        assert!(entries[1].is_fresh);

        let stats = store.stats(freshness).unwrap();
        assert_eq!(
            stats,
            CacheStats {
                total_files: 2,
                fresh_files: 1,
                stale_files: 1,
                unreadable_files: 0,
                total_records: 3,
            }
        );

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list_entries(freshness).unwrap().is_empty());
        assert!(temp_dir.path().join("notes.txt").exists());
        assert!(temp_dir.path().join("package.json").exists());
        assert!(temp_dir.path().join("tags.json").exists());
    }

    #[test]
    fn test_catalog_cache_names() {
        assert!(is_catalog_cache("bb_videos"));
        assert!(is_catalog_cache("bb_details"));
        assert!(is_catalog_cache("bb_channels"));
        assert!(!is_catalog_cache("package"));
        assert!(!is_catalog_cache("_videos"));
        assert!(!is_catalog_cache("bb_videos.backup"));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("gone", &[record("a")]).unwrap();

        assert!(store.remove("gone").unwrap());
        assert!(!store.remove("gone").unwrap());
    }
}
