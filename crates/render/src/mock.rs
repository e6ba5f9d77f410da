//! Stand-in WeasyPrint executable for testing.

use crate::Executable;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes its arguments, then whatever arrived on stdin, then enough padding
/// to clear the minimum PDF size. The last argument is the output (`-` for
/// stdout), exactly like WeasyPrint.
const ECHO_SCRIPT: &str = r#"#!/bin/sh
for out; do :; done
render() { printf '%%PDF-1.7\n%s\n' "$*"; cat; printf '\n%0100d\n' 0; }
if [ "$out" = "-" ]; then render "$@"; else render "$@" > "$out"; fi
"#;

/// A shell script posing as WeasyPrint, living in its own temporary
/// directory for as long as this value is alive.
pub struct FakeWeasyPrint {
    _dir: TempDir,
    path: PathBuf,
}

impl FakeWeasyPrint {
    /// Echoes its input back as a "PDF".
    pub fn new() -> Self {
        Self::with_script(ECHO_SCRIPT)
    }

    /// Exits with `code` without producing output.
    pub fn failing(code: i32) -> Self {
        Self::with_script(&format!("#!/bin/sh\ncat > /dev/null\necho 'boom' >&2\nexit {code}\n"))
    }

    /// Succeeds but writes far fewer bytes than any real PDF.
    pub fn undersized() -> Self {
        Self::with_script("#!/bin/sh\ncat > /dev/null\nprintf '%%PDF'\n")
    }

    /// Panics on failure. If test setup is wrong, then the test should not
    /// pass.
    pub fn with_script(script: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temporary directory");
        let path = dir.path().join("weasyprint");
        std::fs::write(&path, script).expect("write fake weasyprint");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("mark fake weasyprint executable");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn executable(&self) -> Executable {
        Executable::discover(&self.path).expect("fake weasyprint exists")
    }
}

impl Default for FakeWeasyPrint {
    fn default() -> Self {
        Self::new()
    }
}
