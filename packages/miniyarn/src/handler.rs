use miniyarn_utils::Path;

use crate::error::Error;

/// A fetched package (or archive) sitting somewhere on disk. Temporary
/// handlers own their location and remove it when dropped, unless their
/// content got moved elsewhere through `steal`.
#[derive(Debug)]
pub struct Handler {
    path: Path,
    cleanup: Option<Path>,
}

impl Handler {
    pub fn new(path: Path) -> Handler {
        Handler {path, cleanup: None}
    }

    pub fn temporary(path: Path) -> Handler {
        Handler {cleanup: Some(path.clone()), path}
    }

    /// A fresh temporary directory, owned from the start so that it gets
    /// removed whatever happens to the fetch filling it.
    pub fn scratch() -> Result<Handler, Error> {
        Ok(Handler::temporary(Path::temp_dir()?))
    }

    /// Points the handler at another path (typically a file inside its
    /// scratch directory), keeping what it cleans up on drop.
    pub fn with_path(mut self, path: Path) -> Handler {
        Handler {path, cleanup: self.cleanup.take()}
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Relocates the content to `target`. Temporary content is moved, while
    /// content owned by someone else (cache entries, user directories) is
    /// copied.
    pub fn steal(mut self, target: &Path) -> Result<Path, Error> {
        target.fs_rm_if_exists()?;

        match self.cleanup.take() {
            Some(cleanup) => {
                self.path.fs_move(target)?;

                if cleanup != self.path {
                    cleanup.fs_rm_if_exists()?;
                }
            },

            None => {
                target.fs_create_parent()?;
                self.path.fs_copy(target)?;
            },
        }

        Ok(target.clone())
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            if let Err(err) = cleanup.fs_rm_if_exists() {
                log::warn!("Failed to remove {}: {}", cleanup, err);
            }
        }
    }
}
