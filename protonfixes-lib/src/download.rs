//! Cached downloads and archive installation

use crate::error::{ProtonfixesError, Result};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Download manager caching under ~/.cache/protonfixes
pub struct DownloadManager {
    client: Client,
    cache_dir: PathBuf,
}

impl DownloadManager {
    /// Create a download manager with the default protonfixes cache.
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| ProtonfixesError::Download("Could not determine cache directory".into()))?
            .join("protonfixes");
        Self::with_cache_dir(cache_dir)
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Result<Self> {
        let client = Client::builder().user_agent("protonfixes/1.0").build()?;
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { client, cache_dir })
    }

    /// Download a file into the cache, reusing a cached copy when its
    /// checksum still matches (or unconditionally when no checksum is
    /// given).
    pub async fn download(
        &self,
        url: &str,
        filename: &str,
        expected_sha256: Option<&str>,
        progress: bool,
    ) -> Result<PathBuf> {
        let cache_file = self.cache_dir.join(filename);

        if cache_file.exists() {
            match expected_sha256 {
                Some(expected) if !self.verify_checksum(&cache_file, expected)? => {
                    std::fs::remove_file(&cache_file)?;
                }
                _ => return Ok(cache_file),
            }
        }

        info!("Downloading {}", url);
        let mut response = self.client.get(url).send().await?;
        let total_size = response.content_length().unwrap_or(0);

        let pb = if progress && total_size > 0 {
            let pb = ProgressBar::new(total_size);
            let style = ProgressStyle::default_bar()
                .template("{msg} {bar:40.cyan/blue} {bytes}/{total_bytes} {eta}")
                .map_err(|e| ProtonfixesError::Download(format!("Progress bar template error: {e}")))?;
            pb.set_style(style);
            pb.set_message("Downloading");
            Some(pb)
        } else {
            None
        };

        let mut file = std::fs::File::create(&cache_file)?;
        let mut hasher = Sha256::new();

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            hasher.update(&chunk);
            if let Some(ref pb) = pb {
                pb.inc(chunk.len() as u64);
            }
        }

        if let Some(pb) = pb {
            pb.finish_with_message("Downloaded");
        }

        if let Some(expected) = expected_sha256 {
            let computed = format!("{:x}", hasher.finalize());
            if computed != expected {
                std::fs::remove_file(&cache_file)?;
                return Err(ProtonfixesError::ChecksumMismatch {
                    expected: expected.to_string(),
                    got: computed,
                });
            }
        }

        Ok(cache_file)
    }

    /// Verify SHA256 checksum
    pub fn verify_checksum(&self, path: &Path, expected: &str) -> Result<bool> {
        let mut hasher = Sha256::new();
        let mut file = std::fs::File::open(path)?;
        std::io::copy(&mut file, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()) == expected)
    }

    /// Download a tar.gz archive and extract everything into `dest`.
    pub async fn install_all_from_tgz(&self, url: &str, dest: &Path) -> Result<()> {
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProtonfixesError::Download(format!("No filename in url: {url}")))?;

        let archive = self.download(url, filename, None, false).await?;
        extract_tgz(&archive, dest)
    }
}

/// Extract a tar.gz archive into a directory.
pub fn extract_tgz(archive: &Path, dest: &Path) -> Result<()> {
    info!("Extracting {:?} to {:?}", archive, dest);
    std::fs::create_dir_all(dest)?;
    let file = std::fs::File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn build_tgz(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn extracts_all_archive_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("mod.tar.gz");
        build_tgz(&archive, &[("readme.txt", "hello"), ("data/file.bin", "world")]);

        let dest = dir.path().join("out");
        extract_tgz(&archive, &dest).unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("readme.txt")).unwrap(),
            "hello"
        );
        assert_eq!(
            std::fs::read_to_string(dest.join("data/file.bin")).unwrap(),
            "world"
        );
    }

    #[tokio::test]
    async fn cached_file_is_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        let manager = DownloadManager::with_cache_dir(cache.clone()).unwrap();
        std::fs::write(cache.join("mod.tar.gz"), b"cached").unwrap();

        // The URL is never fetched when the cache already holds the file.
        let path = manager
            .download("http://127.0.0.1:9/mod.tar.gz", "mod.tar.gz", None, false)
            .await
            .unwrap();
        assert_eq!(path, cache.join("mod.tar.gz"));
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }

    #[test]
    fn checksum_verification_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob");
        std::fs::write(&file, b"payload").unwrap();

        let manager = DownloadManager::with_cache_dir(dir.path().join("cache")).unwrap();
        let good = format!("{:x}", Sha256::digest(b"payload"));
        assert!(manager.verify_checksum(&file, &good).unwrap());
        assert!(!manager.verify_checksum(&file, &"0".repeat(64)).unwrap());
    }
}
