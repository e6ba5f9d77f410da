use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Default executable name, resolved against `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "weasyprint";

/// A located WeasyPrint executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    path: PathBuf,
}

impl Executable {
    /// Locate the executable described by `configured`.
    ///
    /// An absolute path that exists is used as-is. Otherwise only its file
    /// name is kept and looked up on `PATH`, so a stale absolute path from
    /// another machine still works when WeasyPrint is installed elsewhere.
    pub fn discover(configured: impl AsRef<Path>) -> Result<Self> {
        let configured = configured.as_ref();
        if configured.is_absolute() && configured.is_file() {
            return Ok(Self { path: configured.to_path_buf() });
        }
        let name = configured.file_name().unwrap_or(configured.as_os_str());
        match which::which(name) {
            Ok(path) => {
                tracing::debug!(configured = %configured.display(), path = %path.display(), "Resolved weasyprint on PATH");
                Ok(Self { path })
            },
            Err(_) => {
                tracing::info!(configured = %configured.display(), "WeasyPrint executable not found");
                exn::bail!(ErrorKind::ExecutableNotFound(configured.display().to_string()));
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_a_configuration_error() {
        let err = Executable::discover("/definitely/not/here/paperboy-weasyprint-missing").unwrap_err();
        assert_eq!(
            *err,
            ErrorKind::ExecutableNotFound("/definitely/not/here/paperboy-weasyprint-missing".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn existing_absolute_path_is_used_directly() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weasyprint");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let executable = Executable::discover(&path).unwrap();
        assert_eq!(executable.path(), path);
    }
}
