use crate::error::LibraryError;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

/// Copies each source into `library_dir` under its own base name.
///
/// Returns the names that made it, in input order. A failed copy is logged and
/// left out; it never stops the rest of the batch. Existing files are replaced.
pub async fn ingest_files<F>(library_dir: &Path, sources: &[PathBuf], is_supported: F) -> Vec<String>
where
    F: Fn(&Path) -> bool,
{
    let mut ingested = Vec::with_capacity(sources.len());

    for source in sources {
        match copy_into(library_dir, source, &is_supported).await {
            Ok(file_name) => {
                info!("Ingested {}", file_name);
                ingested.push(file_name);
            }
            Err(e) => error!("{}", e),
        }
    }

    ingested
}

async fn copy_into<F>(library_dir: &Path, source: &Path, is_supported: &F) -> Result<String, LibraryError>
where
    F: Fn(&Path) -> bool,
{
    if !is_supported(source) {
        return Err(LibraryError::Unsupported(source.to_path_buf()));
    }

    let file_name = source
        .file_name()
        .ok_or_else(|| LibraryError::InvalidName(source.display().to_string()))?;
    let destination = library_dir.join(file_name);

    // copying a file onto itself truncates it first
    if is_same_file(source, &destination).await {
        info!("{} is already in the library", destination.display());
        return Ok(file_name.to_string_lossy().into_owned());
    }

    fs::copy(source, &destination)
        .await
        .map_err(|e| LibraryError::Ingest {
            path: source.to_path_buf(),
            source: e,
        })?;

    Ok(file_name.to_string_lossy().into_owned())
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Deletes `file_name` from the library directory.
///
/// `true` only when a file was actually removed. Missing files, names that
/// point outside the directory, and I/O failures all come back as `false`.
pub async fn remove_file(library_dir: &Path, file_name: &str) -> bool {
    let name = match library_file_name(file_name) {
        Ok(name) => name,
        Err(e) => {
            warn!("{}", e);
            return false;
        }
    };
    let path = library_dir.join(name);

    match fs::try_exists(&path).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(e) => {
            error!("Error checking {}: {}", path.display(), e);
            return false;
        }
    }

    match fs::remove_file(&path).await {
        Ok(()) => {
            info!("Deleted {}", file_name);
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            error!("Error deleting {}: {}", file_name, e);
            false
        }
    }
}

/// Accepts only a bare name: one normal path component, nothing that climbs out.
fn library_file_name(file_name: &str) -> Result<&Path, LibraryError> {
    let path = Path::new(file_name);
    let mut components = path.components();

    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(LibraryError::InvalidName(file_name.to_string())),
    }
}
