//! Keeps the local copy of the station archive current and unpacks it.
//!
//! The remote archive is only fetched again when its size differs from the
//! local file. If the size cannot be checked the local archive is used as-is.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{
    header::{HeaderMap, CONTENT_LENGTH},
    Url,
};
use suppaftp::{types::FileType, FtpStream};
use tar::Archive;
use tracing::{info, warn};

use crate::{
    cli::create_spinner,
    error::{ClimateError, Result},
};

const MB: f64 = 1024.0 * 1024.0;

/// Where the archive is fetched from.
#[allow(async_fn_in_trait)]
pub trait ArchiveSource {
    /// Size of the remote archive in bytes, without downloading it.
    async fn remote_size(&self) -> Result<u64>;

    /// Downloads the whole archive to `dest`.
    async fn download(&self, dest: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    UpToDate,
    /// The remote could not be checked; the local archive was kept.
    Stale,
}

/// Makes sure `archive_path` exists and matches the remote, downloading and
/// unpacking into `extract_dir` when it does not.
pub async fn ensure_archive_present<S: ArchiveSource>(
    source: &S,
    archive_path: &Path,
    extract_dir: &Path,
) -> Result<FetchOutcome> {
    if !archive_path.is_file() {
        info!(
            "Archive not found at {}. Starting download...",
            archive_path.display()
        );
        fetch_and_extract(source, archive_path, extract_dir).await?;
        return Ok(FetchOutcome::Downloaded);
    }

    info!("Checking for remote updates (this may take a moment)...");
    let (local_size, remote_size) = match compare_sizes(source, archive_path).await {
        Ok(sizes) => sizes,
        Err(e) => {
            warn!("Could not check remote file size: {}", e);
            info!("Proceeding with existing archive.");
            return Ok(FetchOutcome::Stale);
        }
    };

    info!("Local file size: {:.2} MB", local_size as f64 / MB);
    info!("Remote file size: {:.2} MB", remote_size as f64 / MB);

    if local_size == remote_size {
        info!("Archive is up to date (sizes match).");
        return Ok(FetchOutcome::UpToDate);
    }

    info!("Remote file size differs from local file size. Downloading update...");
    fetch_and_extract(source, archive_path, extract_dir).await?;

    Ok(FetchOutcome::Downloaded)
}

async fn compare_sizes<S: ArchiveSource>(source: &S, archive_path: &Path) -> Result<(u64, u64)> {
    let local_size = fs::metadata(archive_path)?.len();
    let remote_size = source.remote_size().await?;

    Ok((local_size, remote_size))
}

/// Downloads next to the archive and renames over it once complete, so a
/// failed transfer never replaces a good archive.
async fn fetch_and_extract<S: ArchiveSource>(
    source: &S,
    archive_path: &Path,
    extract_dir: &Path,
) -> Result<()> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(archive_path);
    source.download(&partial).await?;
    fs::rename(&partial, archive_path)?;

    extract_archive(archive_path, extract_dir).await
}

fn partial_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Unpacks a gzip tarball into `working_dir` off the async runtime.
pub async fn extract_archive(archive_path: &Path, working_dir: &Path) -> Result<()> {
    info!("Unpacking File: {}", archive_path.display());
    let bar = create_spinner(format!("Unpacking {}...", archive_path.display()));

    let archive_path = archive_path.to_path_buf();
    let working_dir = working_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_tar(&archive_path, &working_dir)).await??;

    bar.finish_with_message("Archive unpacked");
    info!("File Unpacked Successfully");

    Ok(())
}

/// Extracts the tarball at the specified path to the specified working directory.
pub fn extract_tar(tar_gz_path: &Path, working_dir: &Path) -> Result<()> {
    let tar_gz = File::open(tar_gz_path)?;
    let tar = GzDecoder::new(tar_gz);
    let mut archive = Archive::new(tar);

    fs::create_dir_all(working_dir)?;
    archive.unpack(working_dir)?;

    Ok(())
}

/// Picks a transport from the URL scheme.
#[derive(Debug, Clone)]
pub enum RemoteArchive {
    Ftp(FtpSource),
    Http(HttpSource),
}

impl RemoteArchive {
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ClimateError::InvalidUrl(format!("{url}: {e}")))?;

        match parsed.scheme() {
            "ftp" => Ok(RemoteArchive::Ftp(FtpSource::from_url(&parsed)?)),
            "http" | "https" => Ok(RemoteArchive::Http(HttpSource::new(url))),
            other => Err(ClimateError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl ArchiveSource for RemoteArchive {
    async fn remote_size(&self) -> Result<u64> {
        match self {
            RemoteArchive::Ftp(source) => source.remote_size().await,
            RemoteArchive::Http(source) => source.remote_size().await,
        }
    }

    async fn download(&self, dest: &Path) -> Result<()> {
        match self {
            RemoteArchive::Ftp(source) => source.download(dest).await,
            RemoteArchive::Http(source) => source.download(dest).await,
        }
    }
}

/// Anonymous FTP. `SIZE` is the metadata request, `RETR` the download.
#[derive(Debug, Clone, PartialEq)]
pub struct FtpSource {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl FtpSource {
    fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| ClimateError::InvalidUrl(format!("{url}: missing host")))?;

        Ok(FtpSource {
            host: host.to_string(),
            port: url.port().unwrap_or(21),
            path: url.path().to_string(),
        })
    }

    fn connect(&self) -> Result<FtpStream> {
        let mut ftp = FtpStream::connect((self.host.as_str(), self.port))?;
        ftp.login("anonymous", "anonymous")?;
        ftp.transfer_type(FileType::Binary)?;

        Ok(ftp)
    }

    fn size_blocking(&self) -> Result<u64> {
        let mut ftp = self.connect()?;
        let size = ftp.size(&self.path)?;
        let _ = ftp.quit();

        Ok(size as u64)
    }

    fn download_blocking(&self, dest: &Path) -> Result<()> {
        let mut ftp = self.connect()?;
        let total = ftp.size(&self.path).ok().map(|size| size as u64);
        let bar = create_download_bar(total)?;

        let mut file = File::create(dest)?;
        let mut stream = ftp.retr_as_stream(&self.path)?;
        io::copy(&mut bar.wrap_read(&mut stream), &mut file)?;
        ftp.finalize_retr_stream(stream)?;
        let _ = ftp.quit();

        bar.finish_with_message("Archive downloaded");
        Ok(())
    }
}

impl ArchiveSource for FtpSource {
    async fn remote_size(&self) -> Result<u64> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.size_blocking()).await?
    }

    async fn download(&self, dest: &Path) -> Result<()> {
        info!("Downloading New File from ftp://{}{}", self.host, self.path);
        let source = self.clone();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || source.download_blocking(&dest)).await?
    }
}

/// HTTP(S). `HEAD` with `Content-Length` is the metadata request.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: &str) -> Self {
        HttpSource {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

impl ArchiveSource for HttpSource {
    async fn remote_size(&self) -> Result<u64> {
        let response = self.client.head(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ClimateError::HttpStatus(response.status()));
        }

        content_length(response.headers())
            .ok_or_else(|| ClimateError::MissingContentLength(self.url.clone()))
    }

    async fn download(&self, dest: &Path) -> Result<()> {
        info!("Downloading New File from {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ClimateError::HttpStatus(response.status()));
        }

        let bar = create_download_bar(response.content_length())?;
        let mut file = File::create(dest)?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            bar.inc(chunk.len() as u64);
        }
        file.flush()?;

        bar.finish_with_message("Archive downloaded");
        Ok(())
    }
}

// Not `Response::content_length`, which reports the (empty) body of a HEAD.
fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn create_download_bar(total_size: Option<u64>) -> Result<ProgressBar> {
    match total_size {
        Some(total) if total > 0 => Ok(ProgressBar::new(total)
            .with_message("Downloading archive")
            .with_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
                )?
                .progress_chars("=> "),
            )),
        _ => Ok(create_spinner("Downloading archive...".to_string())),
    }
}

// -- Tests -------------------------------------------------------------------
