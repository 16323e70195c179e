//! Build-directory context for monorepos.
//!
//! In a monorepo the build runs from the repository root (where the
//! workspace tool's config lives) while the application sits in a
//! subdirectory. Later build steps read both paths from two text files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Files that mark a monorepo root.
pub const MONOREPO_MARKERS: [&str; 2] = ["nx.json", "turbo.json"];

/// Name of the file holding the build directory.
pub const BUILD_DIRECTORY_FILE: &str = "build-directory.txt";

/// Name of the file holding the project directory relative to the build
/// directory.
pub const RELATIVE_PROJECT_DIRECTORY_FILE: &str = "relative-project-directory.txt";

/// Where to build from, and where the application is relative to that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDirectoryContext {
    /// Directory to run the build from, relative to the working directory.
    /// Empty when no root directory was configured.
    pub build_directory: PathBuf,
    /// Application directory relative to `build_directory`. Empty outside
    /// a monorepo.
    pub relative_project_directory: PathBuf,
}

impl BuildDirectoryContext {
    /// Work out the build context for an application at `root_directory`
    /// (relative to `cwd`).
    ///
    /// The search for a monorepo marker starts at the application directory
    /// and stops at `cwd`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRootDirectory`] if the application directory
    /// does not exist or lies outside `cwd`, and [`Error::Io`] if a marker
    /// cannot be checked.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::operations::BuildDirectoryContext;
    /// use std::path::Path;
    ///
    /// let context = BuildDirectoryContext::detect(Path::new("/workspace"), "").unwrap();
    /// assert_eq!(context, BuildDirectoryContext::default());
    /// ```
    pub fn detect(cwd: &Path, root_directory: &str) -> Result<Self> {
        if root_directory.is_empty() {
            return Ok(Self::default());
        }

        let app_dir = cwd.join(root_directory);
        if let Err(e) = fs::metadata(&app_dir) {
            if e.kind() == ErrorKind::NotFound {
                return Err(Error::InvalidRootDirectory {
                    path: PathBuf::from(root_directory),
                    reason: e.to_string(),
                });
            }
            return Err(Error::io(&app_dir, e));
        }

        let Some(monorepo_root) = Self::find_monorepo_root(cwd, &app_dir)? else {
            return Ok(Self {
                build_directory: PathBuf::from(root_directory),
                relative_project_directory: PathBuf::new(),
            });
        };

        log::info!("detected monorepo root at {}", monorepo_root.display());
        Ok(Self {
            build_directory: relative(&monorepo_root, cwd, root_directory)?,
            relative_project_directory: relative(&app_dir, &monorepo_root, root_directory)?,
        })
    }

    fn find_monorepo_root(cwd: &Path, app_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current = app_dir.to_path_buf();
        loop {
            if has_marker(&current)? {
                return Ok(Some(current));
            }
            if current == cwd || !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Write both files into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory or a file cannot be written.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        for (name, value) in [
            (BUILD_DIRECTORY_FILE, &self.build_directory),
            (RELATIVE_PROJECT_DIRECTORY_FILE, &self.relative_project_directory),
        ] {
            let path = dir.join(name);
            fs::write(&path, value.to_string_lossy().as_bytes())
                .map_err(|e| Error::io(&path, e))?;
        }
        Ok(())
    }
}

fn has_marker(dir: &Path) -> Result<bool> {
    for marker in MONOREPO_MARKERS {
        let path = dir.join(marker);
        match fs::metadata(&path) {
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&path, e)),
        }
    }
    Ok(false)
}

/// `path` relative to `base`, with `.` for the same directory.
fn relative(path: &Path, base: &Path, root_directory: &str) -> Result<PathBuf> {
    let rel = path
        .strip_prefix(base)
        .map_err(|_| Error::InvalidRootDirectory {
            path: PathBuf::from(root_directory),
            reason: format!("{} is outside {}", path.display(), base.display()),
        })?;
    let rel: PathBuf = rel.components().collect();
    if rel.as_os_str().is_empty() {
        Ok(PathBuf::from("."))
    } else {
        Ok(rel)
    }
}
