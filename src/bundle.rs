//! Packaging of the bundle archive uploaded during `setup`.
//!
//! The [`BundlePackager`] checks that the plugin binary and its
//! `PackageContents.xml` manifest exist, then zips them side by side at the
//! archive root, in memory.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::AppBundleConfig;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle input not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("bundle input has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Zips a fixed list of files into an in-memory archive.
pub struct BundlePackager {
    files: Vec<PathBuf>,
}

impl BundlePackager {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Binary first, manifest second.
    pub fn from_config(config: &AppBundleConfig) -> Self {
        Self::new(vec![config.binary_path.clone(), config.manifest_path.clone()])
    }

    /// Builds the archive. Every input is checked before anything is read.
    pub fn package(&self) -> Result<Vec<u8>, BundleError> {
        for file in &self.files {
            let exists = file.is_file();
            debug!(path = %file.display(), exists, "checking bundle input");
            if !exists {
                return Err(BundleError::MissingFile(file.clone()));
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for file in &self.files {
            let name = entry_name(file)?;
            let contents = std::fs::read(file)?;
            writer.start_file(name, options)?;
            writer.write_all(&contents)?;
        }

        let archive = writer.finish()?.into_inner();
        info!(bytes = archive.len(), files = self.files.len(), "bundle packaged");
        Ok(archive)
    }
}

fn entry_name(path: &Path) -> Result<String, BundleError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| BundleError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn packages_files_at_archive_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("bin/Release");
        fs::create_dir_all(&nested).unwrap();
        let dll = nested.join("RFAConversion.dll");
        fs::write(&dll, b"MZ\x90\x00binary").unwrap();
        let manifest = write(&dir, "PackageContents.xml", b"<ApplicationPackage/>");

        let bytes = BundlePackager::new(vec![dll, manifest]).package().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut contents = String::new();
        archive
            .by_name("PackageContents.xml")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "<ApplicationPackage/>");

        let mut binary = Vec::new();
        archive
            .by_name("RFAConversion.dll")
            .unwrap()
            .read_to_end(&mut binary)
            .unwrap();
        assert_eq!(binary, b"MZ\x90\x00binary");
    }

    #[test]
    fn missing_input_names_the_path() {
        let dir = TempDir::new().unwrap();
        let manifest = write(&dir, "PackageContents.xml", b"<x/>");
        let dll = dir.path().join("missing.dll");

        let err = BundlePackager::new(vec![dll.clone(), manifest])
            .package()
            .unwrap_err();
        match err {
            BundleError::MissingFile(path) => assert_eq!(path, dll),
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn directories_are_not_accepted_as_inputs() {
        let dir = TempDir::new().unwrap();
        let err = BundlePackager::new(vec![dir.path().to_path_buf()])
            .package()
            .unwrap_err();
        assert!(matches!(err, BundleError::MissingFile(_)));
    }

    #[test]
    fn from_config_uses_binary_then_manifest() {
        let config = AppBundleConfig::default();
        let packager = BundlePackager::from_config(&config);
        assert_eq!(packager.files, vec![config.binary_path, config.manifest_path]);
    }
}
