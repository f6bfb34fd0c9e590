// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File transfer with progress reporting

use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::DownloadConfig;
use crate::{Result, TurathError};

/// Streams remote files into the download directory
pub struct Downloader {
    client: Client,
    directory: PathBuf,
}

impl Downloader {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            directory: PathBuf::from(&config.directory),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Download `url` to `<directory>/<file_name>`.
    ///
    /// `on_progress` receives written/expected as a fraction whenever the
    /// server declares a length. Data lands in `<file_name>.part` and is
    /// renamed once complete.
    pub async fn download<F>(&self, url: &str, file_name: &str, mut on_progress: F) -> Result<PathBuf>
    where
        F: FnMut(f64),
    {
        check_file_name(file_name)?;
        fs::create_dir_all(&self.directory).await?;

        let target = self.directory.join(file_name);
        let partial = self.directory.join(format!("{}.part", file_name));

        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TurathError::Download(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let expected = response.content_length();
        let mut file = fs::File::create(&partial).await?;

        // Any failure past this point must not leave the .part file behind
        let streamed = async {
            let mut written: u64 = 0;

            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;

                if let Some(total) = expected.filter(|t| *t > 0) {
                    let progress = written as f64 / total as f64;
                    debug!("Download progress: {:.4}", progress);
                    on_progress(progress);
                }
            }

            file.flush().await?;

            if let Some(total) = expected {
                if written != total {
                    return Err(TurathError::Download(format!(
                        "{}: expected {} bytes, received {}",
                        url, total, written
                    )));
                }
            }
            Ok::<_, TurathError>(())
        }
        .await;
        drop(file);

        if let Err(e) = streamed {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        fs::rename(&partial, &target).await?;
        info!("File downloaded to: {}", target.display());
        Ok(target)
    }

    /// Download, logging instead of returning the error
    pub async fn download_logged(&self, url: &str, file_name: &str) -> Option<PathBuf> {
        match self.download(url, file_name, |_| {}).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Error downloading file: {}", e);
                None
            }
        }
    }
}

/// Last path segment of a URL, for when no name is given
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let name = name.trim();
    if name.is_empty() || !path.contains('/') {
        return None;
    }
    check_file_name(name).ok()?;
    Some(name.to_string())
}

fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name.contains("..") || name.contains(['/', '\\']) {
        return Err(TurathError::Download(format!("Invalid file name: {:?}", name)));
    }
    Ok(())
}
