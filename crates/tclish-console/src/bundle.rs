use crate::error::{ConsoleError, Result};
use std::path::Path;
use tracing::info;

/// Fetch the bundle bytes.
///
/// Supported locations:
/// - `http://`, `https://`: one blocking GET via `reqwest`
/// - anything else: a local file path
///
/// # Errors
///
/// - Returns `Err` if the request fails or answers a non-success status
/// - Returns `Err` if the file cannot be read
pub fn fetch(location: &str) -> Result<Vec<u8>> {
    let bytes = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_url(location)?
    } else {
        std::fs::read(Path::new(location))?
    };
    info!("Fetched bundle {} ({} bytes)", location, bytes.len());
    Ok(bytes)
}

fn fetch_url(url: &str) -> Result<Vec<u8>> {
    let failed = |message: String| ConsoleError::Fetch {
        url: url.to_string(),
        message,
    };
    let response = reqwest::blocking::get(url).map_err(|e| failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(failed(format!("status {}", response.status())));
    }
    let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.zip");
        std::fs::write(&path, b"PK").unwrap();
        assert_eq!(fetch(path.to_str().unwrap()).unwrap(), b"PK");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.zip");
        assert!(matches!(
            fetch(path.to_str().unwrap()),
            Err(ConsoleError::Io(_))
        ));
    }
}
