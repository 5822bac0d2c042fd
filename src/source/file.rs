use super::{DocumentSource, SourceError, StalenessSignal};
use std::fs;
use std::path::{Path, PathBuf};

/// A metadata document read from the local filesystem.
///
/// The file's modification time is the staleness signal: a provider backed by
/// this source re-reads the file when its mtime moves past the value recorded
/// at the last refresh, regardless of any embedded expiry.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source for the given path.
    ///
    /// Fails fast: the path must exist, be a regular file, and be readable
    /// at construction time, so misconfiguration surfaces immediately rather
    /// than at first query.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the path is missing, not a regular file,
    /// or unreadable.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();

        let metadata = fs::metadata(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(SourceError::NotAFile { path });
        }

        // Readability probe; the handle is dropped before returning.
        fs::File::open(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path })
    }

    /// Returns the path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        fs::read(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn staleness_signal(&self) -> Result<Option<StalenessSignal>, SourceError> {
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(StalenessSignal::modified_at(modified)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn construction_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::new(dir.path().join("missing.json"));
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }

    #[test]
    fn construction_fails_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::new(dir.path());
        assert!(matches!(result, Err(SourceError::NotAFile { .. })));
    }

    #[test]
    fn fetch_returns_file_contents_and_signal_tracks_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"{}").unwrap();
        drop(file);

        let source = FileSource::new(&path).unwrap();
        assert_eq!(source.fetch().unwrap(), b"{}");

        let first = source.staleness_signal().unwrap().unwrap();

        // Bump mtime explicitly; relying on filesystem timestamp granularity
        // makes the test flaky.
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(later).unwrap();
        drop(file);

        let second = source.staleness_signal().unwrap().unwrap();
        assert!(second > first);
    }
}
