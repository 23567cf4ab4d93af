use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::Result;

/// Replace `path` with `bytes` so readers see the old or the new content,
/// never a partial file. The bytes go to a sibling temp file first and are
/// renamed into place on the same filesystem.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp = tmp_path(path);
    let result = write_tmp(&tmp, bytes).await;
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    info!(path = %path.display(), bytes = bytes.len(), "snapshot file replaced");
    Ok(())
}

/// Read a file, `None` when it does not exist.
pub async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "file does not exist");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_tmp(tmp: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
