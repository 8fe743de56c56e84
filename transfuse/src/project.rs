//! Project directory layout
//!
//! Each extraction owns a directory with a fixed set of files that a
//! later injection finds again through the stream header:
//!
//! ```text
//! original       verbatim source document
//! content.xml    interim form after extraction
//! styled.xml     debug snapshot of the pre-block stage
//! state.sqlite3  persistent style store
//! injected.xml   output of injection
//! ```

use crate::error::TransfuseError;
use crate::store::StyleStore;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
}

impl Project {
    /// Creates the project directory (and parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Project, TransfuseError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| TransfuseError::Io(format!("could not create {}: {e}", dir.display())))?;
        Ok(Project { dir })
    }

    /// Opens an existing project directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Project, TransfuseError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(TransfuseError::Io(format!(
                "project directory did not exist: {}",
                dir.display()
            )));
        }
        Ok(Project { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Verifies the files an injection needs are present.
    pub fn expect_state(&self) -> Result<(), TransfuseError> {
        for name in ["original", "content.xml", "state.sqlite3"] {
            if !self.dir.join(name).exists() {
                return Err(TransfuseError::Io(format!(
                    "project directory {} did not have expected state file {name}",
                    self.dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn open_store(&self) -> Result<StyleStore, TransfuseError> {
        StyleStore::open(&self.dir.join("state.sqlite3"))
    }

    pub fn save_original(&self, data: &[u8]) -> Result<(), TransfuseError> {
        self.write("original", data)
    }

    pub fn load_original(&self) -> Result<Vec<u8>, TransfuseError> {
        let path = self.dir.join("original");
        fs::read(&path)
            .map_err(|e| TransfuseError::Io(format!("could not read {}: {e}", path.display())))
    }

    pub fn save_styled(&self, text: &str) -> Result<(), TransfuseError> {
        self.write("styled.xml", text.as_bytes())
    }

    pub fn save_content(&self, text: &str) -> Result<(), TransfuseError> {
        self.write("content.xml", text.as_bytes())
    }

    pub fn load_content(&self) -> Result<String, TransfuseError> {
        let path = self.dir.join("content.xml");
        fs::read_to_string(&path)
            .map_err(|e| TransfuseError::Io(format!("could not read {}: {e}", path.display())))
    }

    pub fn save_injected(&self, text: &str) -> Result<(), TransfuseError> {
        self.write("injected.xml", text.as_bytes())
    }

    /// Path for a format adapter's final artifact, `injected.<ext>`.
    pub fn injected_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("injected.{ext}"))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<(), TransfuseError> {
        let path = self.dir.join(name);
        fs::write(&path, data)
            .map_err(|e| TransfuseError::Io(format!("could not write {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_directory_fails() {
        assert!(Project::open("/nonexistent/transfuse-project").is_err());
    }

    #[test]
    fn state_files_are_checked() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::create(tmp.path()).unwrap();
        assert!(project.expect_state().is_err());

        project.save_original(b"<doc/>").unwrap();
        project.save_content("<doc/>").unwrap();
        project.open_store().unwrap();
        assert!(project.expect_state().is_ok());
    }

    #[test]
    fn artifacts_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::create(tmp.path()).unwrap();
        project.save_content("<doc>x</doc>").unwrap();
        assert_eq!(project.load_content().unwrap(), "<doc>x</doc>");
        assert_eq!(
            project.injected_path("html"),
            tmp.path().join("injected.html")
        );
    }
}
