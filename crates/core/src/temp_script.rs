//! Scoped temporary files holding the script body.
//!
//! Each execution gets its own file, created inside the working directory
//! with a random component in its name so that concurrent builds sharing a
//! workspace never collide.

use std::io::{self, Write};
use std::path::Path;

use tempfile::TempPath;

/// Handle to a script file written for a single execution.
pub trait ScriptFile: Send {
    /// Location of the file on disk.
    fn path(&self) -> &Path;

    /// Remove the file. Consumes the handle.
    fn delete(self) -> io::Result<()>;
}

/// Creates the text file a script is executed from.
pub trait TempFileFactory: Send + Sync {
    type File: ScriptFile;

    /// Create a new file in `base_dir` named `<prefix><random><suffix>`
    /// containing `contents` verbatim.
    fn create_text_file(
        &self,
        base_dir: &Path,
        prefix: &str,
        suffix: &str,
        contents: &str,
    ) -> io::Result<Self::File>;
}

/// Script file backed by [`tempfile`]. If the handle is dropped without
/// calling [`ScriptFile::delete`], the file is still removed.
#[derive(Debug)]
pub struct WorkspaceScriptFile {
    path: TempPath,
}

impl ScriptFile for WorkspaceScriptFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn delete(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Production factory writing script files with [`tempfile::Builder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceTempFiles;

impl TempFileFactory for WorkspaceTempFiles {
    type File = WorkspaceScriptFile;

    fn create_text_file(
        &self,
        base_dir: &Path,
        prefix: &str,
        suffix: &str,
        contents: &str,
    ) -> io::Result<Self::File> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(base_dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        // Drops the open handle; the file lives until the path is closed.
        Ok(WorkspaceScriptFile {
            path: file.into_temp_path(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
