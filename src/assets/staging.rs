//! Local staging directory for fetched assets and inline scripts.
//!
//! Files are written to a fresh temporary file inside the directory and
//! renamed into place, so a symlink already sitting at the staged path is
//! replaced rather than followed.  The directory itself must be a real
//! directory owned by the current user.
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AssetError;

/// Default staging directory.
pub const DEFAULT_STAGING_DIR: &str = "/tmp/kuzushi";

/// Owner-only read/write/execute.
#[cfg(unix)]
const STAGED_MODE: u32 = 0o700;

/// A single directory holding staged artifacts, one file per basename.
///
/// Touched only from the bootstrap thread; a later asset with the same
/// basename replaces the earlier one.
#[derive(Debug)]
pub struct Staging {
    dir: PathBuf,
    inline_counter: Cell<u32>,
    staged: RefCell<HashSet<PathBuf>>,
}

impl Staging {
    /// Stage into `dir`; it is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inline_counter: Cell::new(0),
            staged: RefCell::new(HashSet::new()),
        }
    }

    /// The staging directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path an asset request stages to: the basename of `request`.
    #[must_use]
    pub fn path_for(&self, request: &str) -> PathBuf {
        let name = request.rsplit('/').next().unwrap_or(request);
        self.dir.join(name)
    }

    /// Write `content` to the staged path for `request`.
    ///
    /// Restaging a basename already written in this run replaces the
    /// earlier content and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Staging`] if the directory or file cannot be
    /// written or its permissions cannot be set.
    pub fn put(&self, request: &str, content: &[u8]) -> Result<PathBuf, AssetError> {
        let path = self.path_for(request);
        if !self.staged.borrow_mut().insert(path.clone()) {
            tracing::warn!(
                "{request} replaces an earlier asset staged at {}",
                path.display()
            );
        }
        self.write(&path, content)?;
        Ok(path)
    }

    /// Write an inline script body to a freshly named file.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Staging`] if the file cannot be written.
    pub fn put_inline(&self, content: &[u8]) -> Result<PathBuf, AssetError> {
        let n = self.inline_counter.get();
        self.inline_counter.set(n + 1);
        let path = self
            .dir
            .join(format!("inline-{}-{n}", std::process::id()));
        self.write(&path, content)?;
        Ok(path)
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<(), AssetError> {
        self.stage(path, content)
            .map_err(|source| AssetError::Staging {
                path: path.display().to_string(),
                source,
            })
    }

    fn stage(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        self.prepare_dir()?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
            let dir_owner = std::fs::symlink_metadata(&self.dir)?.uid();
            if file.as_file().metadata()?.uid() != dir_owner {
                return Err(io::Error::other(format!(
                    "staging directory {} is not owned by the current user",
                    self.dir.display()
                )));
            }
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(STAGED_MODE))?;
        }
        file.write_all(content)?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Create the directory owner-only and refuse anything that is not a
    /// plain directory.
    fn prepare_dir(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt as _;
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(STAGED_MODE)
                .create(&self.dir)?;
        }
        #[cfg(not(unix))]
        std::fs::create_dir_all(&self.dir)?;

        let meta = std::fs::symlink_metadata(&self.dir)?;
        if meta.file_type().is_symlink() || !meta.is_dir() {
            return Err(io::Error::other(format!(
                "staging path {} is not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

impl Default for Staging {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_DIR)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn path_for_uses_basename() {
        let staging = Staging::new("/tmp/kuzushi");
        assert_eq!(
            staging.path_for("/files/zing.conf"),
            PathBuf::from("/tmp/kuzushi/zing.conf")
        );
        assert_eq!(
            staging.path_for("/packages/tool_amd64.deb"),
            PathBuf::from("/tmp/kuzushi/tool_amd64.deb")
        );
    }

    #[test]
    fn put_creates_directory_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path().join("stage"));
        let path = staging.put("/files/zing.conf", b"123").unwrap();
        assert_eq!(path, dir.path().join("stage/zing.conf"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "123");
    }

    #[cfg(unix)]
    #[test]
    fn put_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());
        let path = staging.put("/scripts/setup", b"#!/bin/sh\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn put_inline_uses_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());
        let a = staging.put_inline(b"#!/bin/sh\necho a\n").unwrap();
        let b = staging.put_inline(b"#!/bin/sh\necho b\n").unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "#!/bin/sh\necho b\n");
    }

    #[cfg(unix)]
    #[test]
    fn put_replaces_symlink_instead_of_following_it() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let stage = dir.path().join("stage");
        std::fs::create_dir(&stage).unwrap();
        let victim = dir.path().join("victim");
        std::fs::write(&victim, "original").unwrap();
        std::fs::set_permissions(&victim, std::fs::Permissions::from_mode(0o644)).unwrap();
        std::os::unix::fs::symlink(&victim, stage.join("zing.conf")).unwrap();

        let path = Staging::new(&stage).put("/files/zing.conf", b"fetched").unwrap();

        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "original");
        let victim_mode = std::fs::metadata(&victim).unwrap().permissions().mode();
        assert_eq!(victim_mode & 0o777, 0o644);
        assert!(!std::fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fetched");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_staging_directory_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = dir.path().join("elsewhere");
        std::fs::create_dir(&elsewhere).unwrap();
        let stage = dir.path().join("stage");
        std::os::unix::fs::symlink(&elsewhere, &stage).unwrap();

        assert!(matches!(
            Staging::new(&stage).put("/files/a", b"1"),
            Err(AssetError::Staging { .. })
        ));
        assert_eq!(std::fs::read_dir(&elsewhere).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn new_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let stage = dir.path().join("stage");
        Staging::new(&stage).put("/files/a", b"1").unwrap();
        let mode = std::fs::metadata(&stage).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn restaging_a_basename_warns_and_keeps_latest() {
        let (log, _tmp, _guard) = crate::logging::isolated_logger();
        let log_path = log.log_path().unwrap().clone();
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());

        staging.put("/files/a/app.conf", b"first").unwrap();
        let path = staging.put("/files/b/app.conf", b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let contents = std::fs::read_to_string(log_path).unwrap();
        assert!(contents.contains("[warn] /files/b/app.conf replaces an earlier asset"));
    }

    #[test]
    fn put_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let staging = Staging::new(blocker.join("stage"));
        assert!(matches!(
            staging.put("/files/a", b"1"),
            Err(AssetError::Staging { .. })
        ));
    }
}
