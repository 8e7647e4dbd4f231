//! On-disk package store.
//!
//! Each installed package lives in `<store>/<package>`. Installs are
//! swap-based: the staged tree is moved next to the target, the previous tree
//! is renamed to a hidden backup and the new one renamed into place. The
//! backup is only deleted once the caller commits; until then the install can
//! be rolled back.
//!
//! A commit first renames the backup to `.committed-*`. After a crash, a
//! `.backup-*` left behind therefore means the caller never committed, and
//! recovery puts it back over whatever tree was swapped in.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lpk_schema::PackageId;

const BACKUP_PREFIX: &str = ".backup-";
const INCOMING_PREFIX: &str = ".incoming-";
const TRASH_PREFIX: &str = ".trash-";
const COMMITTED_PREFIX: &str = ".committed-";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("staged tree {0} does not exist")]
    MissingStage(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

fn unique_name(prefix: &str, package: &PackageId) -> String {
    format!("{prefix}{package}-{:016x}", rand::random::<u64>())
}

/// Copy a directory tree, creating `dst`.
fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Delete a leftover, whether it is a tree or a stray file.
fn remove_leftover(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Rename `from` to `to`, copying when they are on different volumes.
fn move_tree(from: &Path, to: &Path) -> Result<(), StoreError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    tracing::debug!(from = %from.display(), to = %to.display(), "rename failed, copying");
    copy_dir_all(from, to)
        .and_then(|()| fs::remove_dir_all(from))
        .map_err(|source| {
            let _ = fs::remove_dir_all(to);
            StoreError::Move {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            }
        })
}

impl PackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, package: &PackageId) -> PathBuf {
        self.root.join(package.as_str())
    }

    pub fn contains(&self, package: &PackageId) -> bool {
        self.package_dir(package).is_dir()
    }

    /// Swap `staged` into place as the tree of `package`.
    ///
    /// On success the new tree is visible immediately and the previous one
    /// (if any) is kept as a backup until [`PendingInstall::commit`].
    ///
    /// # Errors
    ///
    /// Fails if `staged` is missing or a move fails; the previous tree is
    /// restored before returning.
    pub fn install(&self, package: &PackageId, staged: &Path) -> Result<PendingInstall, StoreError> {
        if !staged.is_dir() {
            return Err(StoreError::MissingStage(staged.to_path_buf()));
        }
        fs::create_dir_all(&self.root)?;
        let target = self.package_dir(package);

        // Move next to the target first so the swap itself is two same-volume
        // renames, with no copy while the package has no tree.
        let incoming = self.root.join(unique_name(INCOMING_PREFIX, package));
        if let Err(e) = move_tree(staged, &incoming) {
            let _ = fs::remove_dir_all(&incoming);
            return Err(e);
        }

        let backup = if target.exists() {
            let backup = self.root.join(unique_name(BACKUP_PREFIX, package));
            if let Err(source) = fs::rename(&target, &backup) {
                let _ = fs::remove_dir_all(&incoming);
                return Err(StoreError::Move {
                    from: target,
                    to: backup,
                    source,
                });
            }
            Some(backup)
        } else {
            None
        };

        if let Err(source) = fs::rename(&incoming, &target) {
            let _ = fs::remove_dir_all(&incoming);
            if let Some(backup) = &backup {
                if let Err(restore) = fs::rename(backup, &target) {
                    tracing::error!(package = %package, error = %restore, "failed to restore previous tree");
                }
            }
            return Err(StoreError::Move {
                from: incoming,
                to: target,
                source,
            });
        }

        tracing::debug!(package = %package, replaced = backup.is_some(), "package tree swapped in");
        Ok(PendingInstall {
            package: package.clone(),
            target,
            backup,
            finished: false,
        })
    }

    /// Delete the tree of `package`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the tree cannot be moved aside or deleted.
    pub fn remove(&self, package: &PackageId) -> Result<bool, StoreError> {
        let target = self.package_dir(package);
        if !target.exists() {
            return Ok(false);
        }
        let trash = self.root.join(unique_name(TRASH_PREFIX, package));
        fs::rename(&target, &trash)?;
        fs::remove_dir_all(&trash)?;
        Ok(true)
    }

    /// Clean up after an interrupted install.
    ///
    /// An uncommitted backup replaces the package tree it was swapped out for
    /// (or takes its empty place); staging, trash and committed leftovers are
    /// deleted. Returns the number of restored trees.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the store cannot be listed or cleaned.
    pub fn recover_interrupted(&self) -> Result<usize, StoreError> {
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut restored = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if let Some(rest) = name.strip_prefix(BACKUP_PREFIX) {
                let package = rest
                    .rsplit_once('-')
                    .and_then(|(pkg, _)| PackageId::new(pkg).ok());
                let Some(package) = package else {
                    remove_leftover(&path)?;
                    continue;
                };
                let target = self.package_dir(&package);
                if target.exists() {
                    remove_leftover(&target)?;
                }
                fs::rename(&path, &target)?;
                tracing::warn!(package = %package, "restored package tree of an uncommitted install");
                restored += 1;
            } else if [INCOMING_PREFIX, TRASH_PREFIX, COMMITTED_PREFIX]
                .iter()
                .any(|prefix| name.starts_with(prefix))
            {
                remove_leftover(&path)?;
            }
        }
        Ok(restored)
    }

    /// Delete package trees that no record refers to, such as a first install
    /// interrupted before it was persisted. Returns the removed packages.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the store cannot be listed or a tree deleted.
    pub fn sweep_untracked(&self, known: &HashSet<PackageId>) -> Result<Vec<PackageId>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut swept = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(package) = entry.file_name().to_str().and_then(|n| PackageId::new(n).ok()) else {
                continue;
            };
            if !known.contains(&package) {
                self.remove(&package)?;
                tracing::warn!(package = %package, "removed package tree without a record");
                swept.push(package);
            }
        }
        swept.sort();
        Ok(swept)
    }

    /// List the files of an installed package as `/`-separated relative paths.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the tree cannot be walked.
    pub fn list_files(&self, package: &PackageId) -> io::Result<Vec<String>> {
        let dir = self.package_dir(package);
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&dir).map_err(io::Error::other)?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(parts.join("/"));
        }
        Ok(files)
    }
}

/// A swapped-in package tree awaiting commit.
///
/// Dropping it without calling [`commit`](Self::commit) rolls the install back.
#[derive(Debug)]
pub struct PendingInstall {
    package: PackageId,
    target: PathBuf,
    backup: Option<PathBuf>,
    finished: bool,
}

impl PendingInstall {
    /// Directory of the newly installed tree.
    pub fn path(&self) -> &Path {
        &self.target
    }

    pub fn replaced_existing(&self) -> bool {
        self.backup.is_some()
    }

    /// Keep the new tree and delete the previous one.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the backup cannot be deleted; the new tree
    /// stays in place regardless.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        let Some(backup) = self.backup.take() else {
            return Ok(());
        };
        let committed = backup
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(BACKUP_PREFIX))
            .map(|rest| backup.with_file_name(format!("{COMMITTED_PREFIX}{rest}")));

        match committed {
            Some(committed) if fs::rename(&backup, &committed).is_ok() => {
                fs::remove_dir_all(committed)?;
            }
            // Without the marker the backup must not survive, or recovery
            // would bring it back.
            _ => fs::remove_dir_all(backup)?,
        }
        Ok(())
    }

    /// Put the previous tree back (or remove the new one if there was none).
    ///
    /// # Errors
    ///
    /// Returns the IO error of the first failed step.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.restore()
    }

    fn restore(&mut self) -> Result<(), StoreError> {
        if self.target.exists() {
            fs::remove_dir_all(&self.target)?;
        }
        if let Some(backup) = self.backup.take() {
            fs::rename(backup, &self.target)?;
        }
        tracing::debug!(package = %self.package, "install rolled back");
        Ok(())
    }
}

impl Drop for PendingInstall {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.restore() {
            tracing::error!(package = %self.package, error = %e, "rollback of abandoned install failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pkg() -> PackageId {
        PackageId::new("com.example.unit").unwrap()
    }

    fn stage(root: &Path, name: &str, file: &str, content: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("assets").join(file), content).unwrap();
        dir
    }

    #[test]
    fn test_install_and_commit_replaces_tree() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));

        let first = stage(tmp.path(), "s1", "a.txt", "one");
        store.install(&pkg(), &first).unwrap().commit().unwrap();

        let second = stage(tmp.path(), "s2", "b.txt", "two");
        let pending = store.install(&pkg(), &second).unwrap();
        assert!(pending.replaced_existing());
        pending.commit().unwrap();

        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["assets/b.txt"]);
        assert!(!first.exists() && !second.exists());
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[test]
    fn test_rollback_restores_previous_tree() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        store
            .install(&pkg(), &stage(tmp.path(), "s1", "a.txt", "one"))
            .unwrap()
            .commit()
            .unwrap();

        let pending = store
            .install(&pkg(), &stage(tmp.path(), "s2", "b.txt", "two"))
            .unwrap();
        pending.rollback().unwrap();

        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["assets/a.txt"]);
    }

    #[test]
    fn test_drop_without_commit_rolls_back_fresh_install() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        {
            let _pending = store
                .install(&pkg(), &stage(tmp.path(), "s1", "a.txt", "one"))
                .unwrap();
            assert!(store.contains(&pkg()));
        }
        assert!(!store.contains(&pkg()));
    }

    #[test]
    fn test_missing_stage() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        let err = store.install(&pkg(), &tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, StoreError::MissingStage(_)));
    }

    #[test]
    fn test_remove() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        assert!(!store.remove(&pkg()).unwrap());
        store
            .install(&pkg(), &stage(tmp.path(), "s1", "a.txt", "one"))
            .unwrap()
            .commit()
            .unwrap();
        assert!(store.remove(&pkg()).unwrap());
        assert!(!store.contains(&pkg()));
    }

    #[test]
    fn test_recover_interrupted_swap() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        fs::create_dir_all(store.root()).unwrap();

        // Crash after the old tree was moved aside but before the new one landed.
        let backup = store.root().join(".backup-com.example.unit-00000000deadbeef");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("x"), "old").unwrap();
        fs::create_dir_all(store.root().join(".incoming-com.example.unit-1")).unwrap();

        assert_eq!(store.recover_interrupted().unwrap(), 1);
        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["x"]);
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[test]
    fn test_recover_uncommitted_reinstall_restores_previous_tree() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        store
            .install(&pkg(), &stage(tmp.path(), "s1", "a.txt", "one"))
            .unwrap()
            .commit()
            .unwrap();

        // Crash after the swap, before the caller could commit.
        let pending = store
            .install(&pkg(), &stage(tmp.path(), "s2", "b.txt", "two"))
            .unwrap();
        std::mem::forget(pending);
        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["assets/b.txt"]);

        assert_eq!(store.recover_interrupted().unwrap(), 1);
        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["assets/a.txt"]);
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[test]
    fn test_recover_keeps_committed_tree() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        store
            .install(&pkg(), &stage(tmp.path(), "s1", "b.txt", "new"))
            .unwrap()
            .commit()
            .unwrap();

        // Crash after the commit marker, before the old tree was deleted.
        let committed = store.root().join(".committed-com.example.unit-00000000deadbeef");
        fs::create_dir_all(&committed).unwrap();
        fs::write(committed.join("a.txt"), "old").unwrap();

        assert_eq!(store.recover_interrupted().unwrap(), 0);
        assert_eq!(store.list_files(&pkg()).unwrap(), vec!["assets/b.txt"]);
        assert!(!committed.exists());
    }

    #[test]
    fn test_install_leaves_no_staging_behind() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        let staged = stage(tmp.path(), "s1", "a.txt", "one");
        let pending = store.install(&pkg(), &staged).unwrap();

        assert!(!staged.exists());
        let names: Vec<String> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["com.example.unit"]);
        pending.commit().unwrap();
    }

    #[test]
    fn test_sweep_untracked_removes_unknown_trees() {
        let tmp = tempdir().unwrap();
        let store = PackageStore::new(tmp.path().join("store"));
        let other = PackageId::new("com.example.orphan").unwrap();
        for package in [pkg(), other.clone()] {
            store
                .install(&package, &stage(tmp.path(), package.as_str(), "a.txt", "one"))
                .unwrap()
                .commit()
                .unwrap();
        }

        let known = HashSet::from([pkg()]);
        assert_eq!(store.sweep_untracked(&known).unwrap(), vec![other.clone()]);
        assert!(store.contains(&pkg()));
        assert!(!store.contains(&other));
    }
}
