use crate::error::DataError;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

/// Identity of a file's contents as far as the cache is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl FileStamp {
    pub fn of(path: &Path) -> Result<Self, DataError> {
        let meta = std::fs::metadata(path).map_err(|e| DataError::io(path, e))?;
        let modified = meta.modified().map_err(|e| DataError::io(path, e))?;
        Ok(FileStamp {
            modified,
            len: meta.len(),
        })
    }
}

struct Entry<T> {
    stamp: FileStamp,
    value: Arc<T>,
}

/// Memoizes parsed files by path, modification time and length
///
/// A cached value is reused until the file on disk changes; there is no
/// time-based expiry. Values are handed out as shared, immutable `Arc`s.
pub struct FileCache<T> {
    entries: RwLock<HashMap<PathBuf, Entry<T>>>,
}

impl<T> Default for FileCache<T> {
    fn default() -> Self {
        FileCache {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> FileCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `path`, loading it if the file changed
    ///
    /// The file is stat'ed on every call. A failed load leaves any previous
    /// entry untouched and is returned to the caller.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<(Arc<T>, FileStamp), DataError>
    where
        F: FnOnce(&Path) -> Result<T, DataError>,
    {
        let stamp = FileStamp::of(path)?;

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(path) {
                if entry.stamp == stamp {
                    return Ok((Arc::clone(&entry.value), stamp));
                }
            }
        }

        debug!("cache miss for {}", path.display());
        let value = Arc::new(load(path)?);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            path.to_path_buf(),
            Entry {
                stamp,
                value: Arc::clone(&value),
            },
        );

        Ok((value, stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs::{self, File};
    use std::io::Write;
    use std::time::Duration;

    fn read_len(path: &Path, loads: &Cell<u32>) -> Result<usize, DataError> {
        loads.set(loads.get() + 1);
        fs::read_to_string(path)
            .map(|s| s.len())
            .map_err(|e| DataError::io(path, e))
    }

    #[test]
    fn unchanged_file_is_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "abc").unwrap();

        let cache = FileCache::new();
        let loads = Cell::new(0);
        let (first, _) = cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();
        let (second, _) = cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();

        assert_eq!(*first, 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn changed_length_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "abc").unwrap();

        let cache = FileCache::new();
        let loads = Cell::new(0);
        cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();

        fs::write(&path, "abcdef").unwrap();
        let (value, stamp) = cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();

        assert_eq!(*value, 6);
        assert_eq!(stamp.len, 6);
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn changed_mtime_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "abc").unwrap();

        let cache = FileCache::new();
        let loads = Cell::new(0);
        cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();

        let mut file = File::options().write(true).open(&path).unwrap();
        file.write_all(b"xyz").unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        drop(file);

        cache.get_or_load(&path, |p| read_len(p, &loads)).unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn missing_file_is_an_error_and_not_cached() {
        let cache: FileCache<usize> = FileCache::new();
        let loads = Cell::new(0);
        let err = cache
            .get_or_load(Path::new("nope/missing.csv"), |p| read_len(p, &loads))
            .unwrap_err();

        assert!(matches!(err, DataError::Io { .. }));
        assert_eq!(loads.get(), 0);
    }
}
