//! Per-call context supplied by the caller

use s3relay_core::{ActionError, InvocationId};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Everything an action needs from its caller besides the option bag
#[derive(Debug, Clone)]
pub struct CallContext {
    pub invocation_id: InvocationId,
    /// Base for relative paths when `useFilePath` is set
    pub working_dir: PathBuf,
    /// Files already uploaded by the caller, by name
    pub temp_files: HashMap<String, PathBuf>,
}

impl CallContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            invocation_id: InvocationId::new(),
            working_dir: working_dir.into(),
            temp_files: HashMap::new(),
        }
    }

    /// Context rooted at the process working directory
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn with_temp_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.temp_files.insert(name.into(), path.into());
        self
    }

    /// Locate the local file backing an upload
    ///
    /// An unknown temp-file name is reported as a missing file, the same as a
    /// path that does not exist.
    pub fn resolve_file(&self, file: &str, use_file_path: bool) -> Result<PathBuf, ActionError> {
        if use_file_path {
            return Ok(self.working_dir.join(file));
        }

        self.temp_files.get(file).cloned().ok_or_else(|| {
            ActionError::file_access(
                Path::new(file),
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no uploaded file named '{}'", file),
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_is_relative_to_working_dir() {
        let ctx = CallContext::new("/srv/data");
        let path = ctx.resolve_file("in/x.txt", true).unwrap();
        assert_eq!(path, PathBuf::from("/srv/data/in/x.txt"));
    }

    #[test]
    fn test_temp_file_lookup() {
        let ctx = CallContext::new("/srv/data").with_temp_file("upload", "/tmp/abc123");
        assert_eq!(
            ctx.resolve_file("upload", false).unwrap(),
            PathBuf::from("/tmp/abc123")
        );
    }

    #[test]
    fn test_missing_temp_file_is_not_found() {
        let ctx = CallContext::new("/srv/data");
        match ctx.resolve_file("upload", false).unwrap_err() {
            ActionError::FileAccess { path, source } => {
                assert_eq!(path, PathBuf::from("upload"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
