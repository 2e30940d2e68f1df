//! Segmented, resumable HTTP downloads.
//!
//! A download starts with a `HEAD` probe. When the server advertises
//! `Accept-Ranges: bytes` and a positive `Content-Length`, the file is split
//! into contiguous byte ranges that are fetched concurrently, each into its
//! own part file under `downloads/<stem>/`. Parts are concatenated in index
//! order once every one of them has finished. Otherwise the body is streamed
//! into the destination with a single `GET`.
//!
//! Part files that survive a failed run are picked up again on the next run:
//! a part that is already complete costs no request at all, and a partial
//! one is continued from where it stopped. A small JSON record of the byte
//! ranges sits next to the parts; when it does not match the current
//! partition, the old parts are thrown away instead of resumed.
//!
//! This module never retries on its own; see [`super::retry`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap, RANGE};
use tokio::io::AsyncWriteExt;

use super::progress::Progress;
use crate::config::Config;
use crate::errors::DownloadError;

/// Fixed part of a part's request deadline.
const PART_TIMEOUT_BASE: Duration = Duration::from_secs(30);

/// Slowest transfer rate a part is given time for, in bytes per second.
const MIN_THROUGHPUT: u64 = 50 * 1024;

/// Upper bound for any single request.
pub const MAX_PART_TIMEOUT: Duration = Duration::from_secs(600);

/// One contiguous byte range of the target file. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Part {
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Splits `[0, length)` into at most `concurrency` contiguous ranges.
///
/// The last range absorbs the remainder. When `length` is smaller than
/// `concurrency`, fewer parts are produced so that none is empty.
#[must_use]
pub fn partition(length: u64, concurrency: usize) -> Vec<Part> {
    if length == 0 {
        return Vec::new();
    }
    let count = (concurrency.max(1) as u64).min(length);
    let size = length / count;

    (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i == count - 1 {
                length - 1
            } else {
                start + size - 1
            };
            Part {
                index: usize::try_from(i).unwrap_or(usize::MAX),
                start,
                end,
            }
        })
        .collect()
}

/// Request deadline for transferring `remaining` bytes.
#[must_use]
pub fn part_timeout(remaining: u64) -> Duration {
    (PART_TIMEOUT_BASE + Duration::from_secs(remaining / MIN_THROUGHPUT)).min(MAX_PART_TIMEOUT)
}

/// Directory holding the part files for `destination`.
///
/// Named after the destination file name up to its first `.`, so
/// `downloads/go1.21.0.linux-amd64.tar.gz` keeps its parts in
/// `downloads/go1/`.
#[must_use]
pub fn part_dir(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{name}.parts"),
    };
    destination.with_file_name(stem)
}

/// Path of part `index` for `destination`.
#[must_use]
pub fn part_path(destination: &Path, index: usize) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    part_dir(destination).join(format!("{name}-{index}"))
}

/// Path of the layout record for `destination`'s part files.
#[must_use]
pub fn layout_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    part_dir(destination).join(format!("{name}.layout.json"))
}

/// Byte ranges a set of part files was written for.
///
/// A part file is only resumed when the recorded layout equals the
/// current partition, so a change in concurrency or content length never
/// splices bytes from one layout into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLayout {
    pub length: u64,
    pub ranges: Vec<(u64, u64)>,
}

impl PartLayout {
    #[must_use]
    pub fn new(length: u64, parts: &[Part]) -> Self {
        Self {
            length,
            ranges: parts.iter().map(|p| (p.start, p.end)).collect(),
        }
    }

    async fn load(path: &Path) -> Option<Self> {
        let raw = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn store(&self, path: &Path) -> Result<(), DownloadError> {
        let raw = serde_json::to_vec(self).map_err(|e| DownloadError::InvalidRequest {
            message: format!("failed to encode part layout: {e}"),
        })?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| DownloadError::io(path, e))
    }
}

/// Deletes every part file of `destination` left in `dir`.
async fn discard_parts(dir: &Path, destination: &Path) -> Result<(), DownloadError> {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!("{name}-");

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| DownloadError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DownloadError::io(dir, e))?
    {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let is_part = file_name
            .strip_prefix(&prefix)
            .is_some_and(|index| index.parse::<usize>().is_ok());
        if is_part {
            let path = entry.path();
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| DownloadError::io(&path, e))?;
        }
    }
    Ok(())
}

fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!("{name}.tmp"))
}

fn header_u64(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// What the `HEAD` probe learned about the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Probe {
    length: Option<u64>,
    ranges: bool,
}

/// HTTP downloader with segmented and single-stream modes.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    concurrency: usize,
    probe_timeout: Duration,
    resume: bool,
}

impl Downloader {
    /// Creates a downloader from the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.http_timeout)
            .user_agent(concat!("sv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::InvalidRequest {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self::with_client(
            client,
            config.concurrency,
            config.http_timeout,
        ))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, concurrency: usize, probe_timeout: Duration) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            probe_timeout,
            resume: true,
        }
    }

    /// Enables or disables reuse of part files from an earlier run.
    #[must_use]
    pub fn resume(mut self, enabled: bool) -> Self {
        self.resume = enabled;
        self
    }

    /// Downloads `url` into `destination`, mirroring bytes into `progress`.
    ///
    /// In segmented mode every part runs to completion before the result is
    /// decided. When several parts fail, the error returned is the one from
    /// the lowest part index, not the one that happened first in time.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty URL or file name, a non-success
    /// status, a timeout, a transport failure, a malformed ranged response,
    /// or a local I/O failure.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress: &Progress,
    ) -> Result<(), DownloadError> {
        if url.trim().is_empty() {
            return Err(DownloadError::InvalidRequest {
                message: "URL is empty".to_string(),
            });
        }
        if destination
            .file_name()
            .is_none_or(|n| n.to_string_lossy().trim().is_empty())
        {
            return Err(DownloadError::InvalidRequest {
                message: format!("destination has no file name: {}", destination.display()),
            });
        }
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        progress.reset();
        let probe = self.probe(url).await?;
        tracing::debug!(url, length = ?probe.length, ranges = probe.ranges, "probed download");

        match probe {
            Probe {
                length: Some(length),
                ranges: true,
            } if length > 0 => self.download_parts(url, destination, length, progress).await,
            Probe { length, .. } => self.download_single(url, destination, length, progress).await,
        }
    }

    async fn probe(&self, url: &str) -> Result<Probe, DownloadError> {
        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response.headers();
        let ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));

        Ok(Probe {
            length: header_u64(headers, CONTENT_LENGTH),
            ranges,
        })
    }

    async fn download_parts(
        &self,
        url: &str,
        destination: &Path,
        length: u64,
        progress: &Progress,
    ) -> Result<(), DownloadError> {
        let parts = partition(length, self.concurrency);
        progress.set_total(length);

        let dir = part_dir(destination);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DownloadError::io(&dir, e))?;

        let layout = PartLayout::new(length, &parts);
        let layout_file = layout_path(destination);
        let previous = PartLayout::load(&layout_file).await;
        if previous.as_ref() != Some(&layout) {
            if previous.is_some() {
                tracing::debug!(url, "part layout changed, discarding earlier parts");
            }
            discard_parts(&dir, destination).await?;
            layout.store(&layout_file).await?;
        }
        tracing::debug!(url, parts = parts.len(), length, "starting segmented download");

        let handles: Vec<_> = parts
            .iter()
            .map(|part| {
                let job = PartJob {
                    client: self.client.clone(),
                    url: url.to_string(),
                    path: part_path(destination, part.index),
                    part: *part,
                    resume: self.resume,
                    progress: progress.clone(),
                };
                tokio::spawn(job.run())
            })
            .collect();

        let mut first_error = None;
        for (index, handle) in handles.into_iter().enumerate() {
            let result = handle
                .await
                .unwrap_or_else(|_| Err(DownloadError::Worker { index }));
            if let Err(e) = result {
                tracing::debug!(part = index, error = %e, "part failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        merge(destination, &parts).await?;
        for part in &parts {
            let path = part_path(destination, part.index);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(part = %path.display(), error = %e, "failed to remove part file");
            }
        }
        if let Err(e) = tokio::fs::remove_file(&layout_file).await {
            tracing::warn!(layout = %layout_file.display(), error = %e, "failed to remove part layout");
        }
        // Other archives sharing the stem may still have parts here.
        if let Err(e) = tokio::fs::remove_dir(&dir).await {
            tracing::debug!(dir = %dir.display(), error = %e, "part directory left in place");
        }
        Ok(())
    }

    async fn download_single(
        &self,
        url: &str,
        destination: &Path,
        length: Option<u64>,
        progress: &Progress,
    ) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(length.map_or(MAX_PART_TIMEOUT, part_timeout))
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        progress.set_total(length.or_else(|| header_u64(response.headers(), CONTENT_LENGTH)).unwrap_or(0));

        let tmp = temp_path(destination);
        let file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| DownloadError::io(&tmp, e))?;
        let mut writer = progress.writer(file);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::from_reqwest(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(&tmp, e))?;
        }
        writer.flush().await.map_err(|e| DownloadError::io(&tmp, e))?;
        drop(writer);

        tokio::fs::rename(&tmp, destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))
    }
}

/// Everything one part task needs, owned so it can be spawned.
struct PartJob {
    client: reqwest::Client,
    url: String,
    path: PathBuf,
    part: Part,
    resume: bool,
    progress: Progress,
}

impl PartJob {
    async fn run(self) -> Result<(), DownloadError> {
        let expected = self.part.len();
        let mut existing = 0;
        if self.resume
            && let Ok(meta) = tokio::fs::metadata(&self.path).await
        {
            existing = meta.len();
        }
        if existing > expected {
            tracing::debug!(part = self.part.index, existing, expected, "part file oversized, refetching");
            existing = 0;
        }
        if existing == expected {
            tracing::debug!(part = self.part.index, "part already complete");
            self.progress.add(expected);
            return Ok(());
        }
        self.progress.add(existing);

        let file = if existing > 0 {
            tokio::fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .await
        } else {
            tokio::fs::File::create(&self.path).await
        }
        .map_err(|e| DownloadError::io(&self.path, e))?;

        let start = self.part.start + existing;
        let remaining = expected - existing;
        let url = self.url.as_str();
        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={start}-{}", self.part.end))
            .timeout(part_timeout(remaining))
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(if status.is_success() {
                DownloadError::protocol(url, format!("expected 206 for a ranged request, got {status}"))
            } else {
                DownloadError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                }
            });
        }

        let mut writer = self.progress.writer(file);
        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::from_reqwest(url, e))?;
            received += chunk.len() as u64;
            if received > remaining {
                return Err(DownloadError::protocol(
                    url,
                    format!("part {} exceeded its range of {remaining} bytes", self.part.index),
                ));
            }
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(&self.path, e))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(&self.path, e))?;

        if received < remaining {
            return Err(DownloadError::protocol(
                url,
                format!(
                    "part {} incomplete: received {received} of {remaining} bytes",
                    self.part.index
                ),
            ));
        }
        Ok(())
    }
}

/// Concatenates part files in index order into `destination`.
async fn merge(destination: &Path, parts: &[Part]) -> Result<(), DownloadError> {
    let tmp = temp_path(destination);
    let mut output = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| DownloadError::io(&tmp, e))?;

    for part in parts {
        let path = part_path(destination, part.index);
        let mut input = tokio::fs::File::open(&path)
            .await
            .map_err(|e| DownloadError::io(&path, e))?;
        tokio::io::copy(&mut input, &mut output)
            .await
            .map_err(|e| DownloadError::io(&tmp, e))?;
    }
    output.flush().await.map_err(|e| DownloadError::io(&tmp, e))?;
    drop(output);

    tokio::fs::rename(&tmp, destination)
        .await
        .map_err(|e| DownloadError::io(destination, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const FILE: &str = "go1.21.0.linux-amd64.tar.gz";

    /// Serves byte ranges of a fixed body and records each `Range` header.
    struct RangeResponder {
        body: Arc<Vec<u8>>,
        ranges: Arc<Mutex<Vec<String>>>,
        status_for_ranges: u16,
    }

    impl Respond for RangeResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let Some(range) = request.headers.get("range").and_then(|v| v.to_str().ok()) else {
                return ResponseTemplate::new(200).set_body_bytes(self.body.to_vec());
            };
            self.ranges.lock().unwrap().push(range.to_string());
            if self.status_for_ranges != 206 {
                return ResponseTemplate::new(self.status_for_ranges)
                    .set_body_bytes(self.body.to_vec());
            }
            let (start, end) = range
                .trim_start_matches("bytes=")
                .split_once('-')
                .map(|(s, e)| (s.parse::<usize>().unwrap(), e.parse::<usize>().unwrap()))
                .unwrap();
            ResponseTemplate::new(206)
                .insert_header(
                    "content-range",
                    format!("bytes {start}-{end}/{}", self.body.len()).as_str(),
                )
                .set_body_bytes(self.body[start..=end].to_vec())
        }
    }

    fn sample_body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    async fn ranged_server(body: &[u8], status_for_ranges: u16) -> (MockServer, Arc<Mutex<Vec<String>>>) {
        let server = MockServer::start().await;
        let ranges = Arc::new(Mutex::new(Vec::new()));
        Mock::given(method("HEAD"))
            .and(path(format!("/dl/{FILE}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("accept-ranges", "bytes")
                    .set_body_bytes(body.to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/dl/{FILE}")))
            .respond_with(RangeResponder {
                body: Arc::new(body.to_vec()),
                ranges: Arc::clone(&ranges),
                status_for_ranges,
            })
            .mount(&server)
            .await;
        (server, ranges)
    }

    fn downloader(concurrency: usize) -> Downloader {
        Downloader::with_client(reqwest::Client::new(), concurrency, Duration::from_secs(10))
    }

    /// Leaves part files behind as an interrupted run with `concurrency` would.
    fn seed_parts(dest: &Path, length: u64, concurrency: usize, parts: &[(usize, &[u8])]) {
        std::fs::create_dir_all(part_dir(dest)).unwrap();
        let layout = PartLayout::new(length, &partition(length, concurrency));
        std::fs::write(layout_path(dest), serde_json::to_vec(&layout).unwrap()).unwrap();
        for (index, bytes) in parts {
            std::fs::write(part_path(dest, *index), bytes).unwrap();
        }
    }

    #[test]
    fn partition_covers_range_without_gaps() {
        for length in [1u64, 2, 3, 7, 100, 1000, 10_485_760] {
            for concurrency in [1usize, 2, 3, 4, 8, 16] {
                let parts = partition(length, concurrency);
                assert_eq!(parts.len() as u64, (concurrency as u64).min(length));
                assert_eq!(parts[0].start, 0);
                assert_eq!(parts.last().unwrap().end, length - 1);
                for pair in parts.windows(2) {
                    assert_eq!(pair[0].end + 1, pair[1].start);
                }
                assert!(parts.iter().all(|p| p.len() > 0));
                assert_eq!(parts.iter().map(Part::len).sum::<u64>(), length);
            }
        }
    }

    #[test]
    fn partition_last_part_absorbs_remainder() {
        let parts = partition(10, 3);
        assert_eq!(
            parts,
            vec![
                Part { index: 0, start: 0, end: 2 },
                Part { index: 1, start: 3, end: 5 },
                Part { index: 2, start: 6, end: 9 },
            ]
        );
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn part_timeout_scales_and_caps() {
        assert_eq!(part_timeout(0), PART_TIMEOUT_BASE);
        assert!(part_timeout(10 * 1024 * 1024) > part_timeout(1024 * 1024));
        assert_eq!(part_timeout(u64::MAX), MAX_PART_TIMEOUT);
    }

    #[test]
    fn part_files_live_under_stem_directory() {
        let dest = Path::new("/home/u/.sv/downloads").join(FILE);
        assert_eq!(part_dir(&dest), Path::new("/home/u/.sv/downloads/go1"));
        assert_eq!(
            part_path(&dest, 3),
            Path::new("/home/u/.sv/downloads/go1").join(format!("{FILE}-3"))
        );
    }

    #[tokio::test]
    async fn ten_megabytes_in_four_parts_match_the_source() {
        let body = sample_body(10 * 1024 * 1024);
        let (server, ranges) = ranged_server(&body, 206).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);
        let progress = Progress::new("test", 0);

        downloader(4)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &progress)
            .await
            .expect("download should succeed");

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!part_dir(&dest).exists());
        assert_eq!(ranges.lock().unwrap().len(), 4);
        assert_eq!(progress.current(), body.len() as u64);
        assert_eq!(progress.total(), body.len() as u64);
    }

    #[tokio::test]
    async fn complete_parts_are_not_requested_again() {
        let body = sample_body(4000);
        let (server, ranges) = ranged_server(&body, 206).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        let parts = partition(body.len() as u64, 4);
        seed_parts(&dest, 4000, 4, &[(0, &body[..1000]), (1, &body[1000..1400])]);
        assert_eq!(parts[1].start, 1000);

        downloader(4)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let mut seen = ranges.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["bytes=1400-1999", "bytes=2000-2999", "bytes=3000-3999"]);
    }

    #[tokio::test]
    async fn oversized_part_is_refetched() {
        let body = sample_body(2000);
        let (server, ranges) = ranged_server(&body, 206).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        seed_parts(&dest, 2000, 2, &[(0, &[0u8; 1500][..])]);

        downloader(2)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(ranges.lock().unwrap().contains(&"bytes=0-999".to_string()));
    }

    #[tokio::test]
    async fn parts_from_another_layout_are_discarded() {
        let body = sample_body(4000);
        let (server, ranges) = ranged_server(&body, 206).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        // Complete parts 0 and 1 of a four-way split, then resume two-way.
        seed_parts(&dest, 4000, 4, &[(0, &body[..1000]), (1, &body[1000..2000])]);

        downloader(2)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let mut seen = ranges.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["bytes=0-1999", "bytes=2000-3999"]);
        assert!(!part_dir(&dest).exists());
    }

    #[tokio::test]
    async fn parts_without_layout_record_are_discarded() {
        let body = sample_body(2000);
        let (server, ranges) = ranged_server(&body, 206).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        std::fs::create_dir_all(part_dir(&dest)).unwrap();
        std::fs::write(part_path(&dest, 0), vec![7u8; 1000]).unwrap();
        std::fs::write(part_path(&dest, 5), b"stale").unwrap();

        downloader(2)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(ranges.lock().unwrap().len(), 2);
        assert!(!part_path(&dest, 5).exists());
    }

    #[tokio::test]
    async fn failed_run_keeps_layout_for_resume() {
        let body = sample_body(1000);
        let (server, _) = ranged_server(&body, 503).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        downloader(2)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap_err();

        let raw = std::fs::read(layout_path(&dest)).unwrap();
        let layout: PartLayout = serde_json::from_slice(&raw).unwrap();
        assert_eq!(layout, PartLayout::new(1000, &partition(1000, 2)));
    }

    #[tokio::test]
    async fn slow_probe_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();

        let err = Downloader::with_client(reqwest::Client::new(), 2, Duration::from_millis(100))
            .download(
                &format!("{}/dl/{FILE}", server.uri()),
                &temp.path().join(FILE),
                &Progress::new("t", 0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Timeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn segmented_result_equals_single_stream_result() {
        let body = sample_body(123_457);
        let temp = tempfile::tempdir().unwrap();

        let (ranged, _) = ranged_server(&body, 206).await;
        let segmented = temp.path().join("a").join(FILE);
        downloader(7)
            .download(&format!("{}/dl/{FILE}", ranged.uri()), &segmented, &Progress::new("t", 0))
            .await
            .unwrap();

        let plain = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&plain)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&plain)
            .await;
        let single = temp.path().join("b").join(FILE);
        let progress = Progress::new("t", 0);
        downloader(7)
            .download(&format!("{}/dl/{FILE}", plain.uri()), &single, &progress)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&segmented).unwrap(), std::fs::read(&single).unwrap());
        assert_eq!(progress.current(), body.len() as u64);
        assert!(!part_dir(&single).exists());
    }

    #[tokio::test]
    async fn ignored_range_is_a_protocol_error() {
        let body = sample_body(1000);
        let (server, _) = ranged_server(&body, 200).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        let err = downloader(2)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Protocol { .. }), "{err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn failing_part_reports_status_and_keeps_nothing_merged() {
        let body = sample_body(1000);
        let (server, _) = ranged_server(&body, 503).await;
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join(FILE);

        let err = downloader(3)
            .download(&format!("{}/dl/{FILE}", server.uri()), &dest, &Progress::new("t", 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 503, .. }), "{err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn probe_status_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp = tempfile::tempdir().unwrap();

        let err = downloader(2)
            .download(
                &format!("{}/dl/missing.tar.gz", server.uri()),
                &temp.path().join("missing.tar.gz"),
                &Progress::new("t", 0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn empty_url_is_rejected_without_network() {
        let temp = tempfile::tempdir().unwrap();
        let err = downloader(2)
            .download("  ", &temp.path().join(FILE), &Progress::new("t", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidRequest { .. }));
    }
}
