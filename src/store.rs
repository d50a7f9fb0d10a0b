use crate::error::StoreError;
use crate::redact;
use std::path::{Component, Path, PathBuf};

/// Byte budget for file content fed back to the oracle. Larger files are
/// truncated with a marker rather than rejected.
const MAX_ORACLE_FILE_BYTES: usize = 65_536;

/// Project-rooted file access for everything the engine and orchestrator
/// touch. Every path is admitted lexically, then checked again after symlink
/// resolution; a path that escapes the root is refused, never clamped back
/// inside. All content returned by reads has passed secret redaction.
pub struct SandboxedStore {
    root: PathBuf,
}

impl SandboxedStore {
    /// Root must exist; it is canonicalized once so later containment checks
    /// compare against a stable base.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lexical admission: reject traversal before touching the filesystem.
    fn admit(&self, path: &Path) -> Result<PathBuf, StoreError> {
        let raw = path.to_string_lossy();

        if raw.contains('\0') {
            return Err(denied(path, "null byte in path"));
        }

        let lowered = raw.to_lowercase();
        if lowered.contains("%2e") || lowered.contains("%2f") || lowered.contains("%5c") {
            return Err(denied(path, "url-encoded traversal"));
        }

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(denied(path, "parent traversal"));
        }

        let full = if path.is_absolute() {
            if !path.starts_with(&self.root) {
                return Err(denied(path, "outside project root"));
            }
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        Ok(full)
    }

    /// Resolve symlinks and require the real location to stay under the root.
    async fn resolve_for_read(&self, path: &Path) -> Result<PathBuf, StoreError> {
        let full = self.admit(path)?;
        let canonical = tokio::fs::canonicalize(&full).await?;
        if !canonical.starts_with(&self.root) {
            return Err(denied(path, "resolved outside project root"));
        }
        Ok(canonical)
    }

    /// Read a file as UTF-8 text with secrets redacted.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<String, StoreError> {
        let canonical = self.resolve_for_read(path.as_ref()).await?;
        let raw = tokio::fs::read_to_string(&canonical).await?;
        Ok(redact::redact_secrets(&raw).into_owned())
    }

    /// Like [`read`](Self::read), but a missing file is `None` instead of an
    /// error. Traversal attempts still fail.
    pub async fn read_if_exists(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<String>, StoreError> {
        match self.read(path).await {
            Ok(content) => Ok(Some(content)),
            Err(StoreError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Read for oracle consumption: redacted and truncated to a fixed byte
    /// budget so a minified bundle cannot blow up the transcript.
    pub async fn read_for_oracle(&self, path: impl AsRef<Path>) -> Result<String, StoreError> {
        let mut content = self.read(path).await?;
        if content.len() > MAX_ORACLE_FILE_BYTES {
            let mut end = MAX_ORACLE_FILE_BYTES;
            while end > 0 && !content.is_char_boundary(end) {
                end -= 1;
            }
            content.truncate(end);
            content.push_str("\n... [truncated]");
        }
        Ok(content)
    }

    /// Write UTF-8 text, creating parent directories as needed. The parent is
    /// canonicalized after creation so a symlinked directory cannot smuggle
    /// the write outside the root; symlink targets are refused outright.
    pub async fn write(&self, path: impl AsRef<Path>, contents: &str) -> Result<(), StoreError> {
        let path = path.as_ref();
        let full = self.admit(path)?;

        let Some(file_name) = full.file_name() else {
            return Err(denied(path, "not a file path"));
        };

        let parent = full.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&parent).await?;

        let canonical_parent = tokio::fs::canonicalize(&parent).await?;
        if !canonical_parent.starts_with(&self.root) {
            return Err(denied(path, "resolved outside project root"));
        }

        let target = canonical_parent.join(file_name);
        if let Ok(meta) = tokio::fs::symlink_metadata(&target).await {
            if meta.file_type().is_symlink() {
                return Err(denied(path, "refusing to write through a symlink"));
            }
        }

        tokio::fs::write(&target, contents).await?;
        Ok(())
    }
}

fn denied(path: &Path, reason: &str) -> StoreError {
    StoreError::Denied {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
