//! Download and decompression of the bulk export.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use flate2::read::GzDecoder;
use humansize::{format_size, BINARY};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::defaults;
use crate::error::{bail, DataprepResult};
use crate::progress::ProgressBarBuilder;

const PBAR_DOWNLOAD: &str =
    "Downloading: {bytes}/{total_bytes} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

const PBAR_DECOMPRESS: &str =
    "Decompressing: {bytes} | elapsed: {elapsed_precise}{msg}";

/// Credentials for (basic) authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Basic { username: String, password: String },
    /// An already encoded `username:password` pair.
    Encoded(String),
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub base_url: Url,
    pub target_file: String,
    pub output_dir: PathBuf,
    /// The name of the resulting file. Defaults to the target file
    /// without a `.gz` extension.
    pub output_file: Option<String>,
    pub auth: Option<Auth>,
    /// Don't download (or decompress) again, if the file exists.
    pub skip_if_exists: bool,
    pub delete_compressed_archive: bool,
    pub quiet: bool,
}

impl FetchOptions {
    pub fn new(base_url: Url, output_dir: PathBuf) -> Self {
        Self {
            base_url,
            target_file: defaults::TARGET_FILE.into(),
            output_dir,
            output_file: None,
            auth: None,
            skip_if_exists: true,
            delete_compressed_archive: true,
            quiet: false,
        }
    }

    /// Returns the URL of the target file.
    pub fn url(&self) -> DataprepResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        match Url::parse(&format!("{base}/{}", self.target_file)) {
            Ok(url) => Ok(url),
            Err(e) => bail!("invalid url: {e}"),
        }
    }

    /// Returns the paths of the downloaded and the resulting file.
    pub fn paths(&self) -> (PathBuf, PathBuf) {
        let output_dir = expand_home(&self.output_dir);
        let download = output_dir.join(&self.target_file);

        let output = match self.output_file {
            Some(ref name) => output_dir.join(name),
            None => match self.target_file.strip_suffix(".gz") {
                Some(stem) => output_dir.join(stem),
                None => download.clone(),
            },
        };

        (download, output)
    }
}

/// Expands a leading `~` to the home directory of the current user.
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }

    path.to_path_buf()
}

/// Returns the default directory for downloads and caches.
pub fn cache_dir() -> DataprepResult<PathBuf> {
    if let Some(dirs) = ProjectDirs::from("de", "its-jointly", "dataprep") {
        let cache_dir = dirs.cache_dir();
        if !cache_dir.exists() {
            fs::create_dir_all(cache_dir)?;
        }

        return Ok(cache_dir.to_path_buf());
    }

    bail!("unable to determine cache directory!")
}

fn download(url: Url, path: &Path, options: &FetchOptions) -> DataprepResult<()> {
    log::info!("downloading {url}");

    let mut request = Client::builder().timeout(None).build()?.get(url);
    request = match options.auth {
        Some(Auth::Basic {
            ref username,
            ref password,
        }) => request.basic_auth(username, Some(password)),
        Some(Auth::Encoded(ref encoded)) => {
            request.header(AUTHORIZATION, format!("Basic {encoded}"))
        }
        None => request,
    };

    let response = request.send()?.error_for_status()?;
    let mut pbar = ProgressBarBuilder::new(PBAR_DOWNLOAD, options.quiet);
    if let Some(len) = response.content_length() {
        pbar = pbar.len(len);
    }
    let pbar = pbar.build();

    let mut out = BufWriter::new(File::create(path)?);
    io::copy(&mut pbar.wrap_read(response), &mut out)?;
    out.flush()?;
    pbar.finish_and_clear();

    Ok(())
}

fn decompress(src: &Path, dst: &Path, quiet: bool) -> DataprepResult<()> {
    log::info!("decompressing {}", src.display());

    let pbar = ProgressBarBuilder::new(PBAR_DECOMPRESS, quiet).build();
    let decoder = GzDecoder::new(BufReader::new(File::open(src)?));
    let mut out = BufWriter::new(File::create(dst)?);
    io::copy(&mut pbar.wrap_read(decoder), &mut out)?;
    out.flush()?;
    pbar.finish_and_clear();

    Ok(())
}

/// Downloads the export and decompresses it, if it is gzipped.
/// Returns the path of the resulting file.
pub fn fetch(options: &FetchOptions) -> DataprepResult<PathBuf> {
    let (download_path, output_path) = options.paths();

    if options.skip_if_exists && output_path.exists() {
        log::info!(
            "{} already exists; skipping download",
            output_path.display()
        );
        return Ok(output_path);
    }

    if let Some(parent) = download_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if options.skip_if_exists && download_path.exists() {
        log::info!(
            "{} already exists; skipping download",
            download_path.display()
        );
    } else {
        download(options.url()?, &download_path, options)?;
    }

    if output_path != download_path {
        decompress(&download_path, &output_path, options.quiet)?;
        if options.delete_compressed_archive {
            fs::remove_file(&download_path)?;
        }
    }

    let size = fs::metadata(&output_path)?.len();
    log::info!(
        "fetched {} ({})",
        output_path.display(),
        format_size(size, BINARY)
    );

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    type TestResult = anyhow::Result<()>;

    fn options(dir: &Path) -> anyhow::Result<FetchOptions> {
        let mut options =
            FetchOptions::new(Url::parse("http://127.0.0.1:9/")?, dir.into());
        options.quiet = true;
        Ok(options)
    }

    #[test]
    fn url_and_paths() -> TestResult {
        let options = options(Path::new("/tmp/data"))?;
        assert_eq!(
            options.url()?.as_str(),
            "http://127.0.0.1:9/workspace_data-public-only.json.gz"
        );

        let (download, output) = options.paths();
        assert_eq!(
            download,
            PathBuf::from("/tmp/data/workspace_data-public-only.json.gz")
        );
        assert_eq!(
            output,
            PathBuf::from("/tmp/data/workspace_data-public-only.json")
        );
        Ok(())
    }

    #[test]
    fn fetch_skips_existing_output() -> TestResult {
        let dir = tempfile::tempdir()?;
        let options = options(dir.path())?;
        let (_, output) = options.paths();
        fs::write(&output, "{}\n")?;

        assert_eq!(fetch(&options)?, output);
        Ok(())
    }

    #[test]
    fn fetch_decompresses_existing_archive() -> TestResult {
        let dir = tempfile::tempdir()?;
        let options = options(dir.path())?;
        let (download, output) = options.paths();

        let mut encoder =
            GzEncoder::new(File::create(&download)?, Compression::fast());
        encoder.write_all(b"{\"a\": 1}\n")?;
        encoder.finish()?;

        assert_eq!(fetch(&options)?, output);
        assert_eq!(fs::read_to_string(&output)?, "{\"a\": 1}\n");
        assert!(!download.exists());
        Ok(())
    }

    #[test]
    fn expand_home_keeps_other_paths() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
