use rand::{Rng, distributions::Alphanumeric};
use ring::digest::{Context, SHA256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, Result as IoResult};

/// Calculate SHA-256 hash of a file
pub async fn sha256_file<P: AsRef<Path>>(path: P) -> IoResult<String> {
    let mut file = File::open(path).await?;
    let mut context = Context::new(&SHA256);
    let mut buffer = [0u8; 1024 * 64];

    loop {
        let count = file.read(&mut buffer).await?;
        if count == 0 {
            break;
        }
        context.update(&buffer[..count]);
    }

    let digest = context.finish();
    Ok(hex::encode(digest.as_ref()))
}

/// Generate a random alphanumeric string ID
pub fn random_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Get the filename from a path
pub fn get_filename(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|os_str| os_str.to_str())
        .map(String::from)
}

/// Check that a path exists and is a regular file, returning its size
pub async fn check_file(path: &Path) -> IoResult<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok(metadata.len())
}

/// Create directory if it doesn't exist
pub async fn ensure_dir(path: &Path) -> IoResult<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}
