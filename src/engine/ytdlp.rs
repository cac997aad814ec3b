use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Output,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use super::{DownloadJob, DownloadOutcome, MediaEngine, OutputPolicy, ProbePurpose, RawMedia};
use crate::error::EngineError;

const FILE_MARKER: &str = "[file] ";
const TITLE_MARKER: &str = "[title] ";
const PLAYLIST_MARKER: &str = "[playlist] ";

/// [`MediaEngine`] backed by the `yt-dlp` command line program.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    download_root: PathBuf,
    timeout: Option<Duration>,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, download_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            download_root: download_root.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    async fn run(&self, args: Vec<String>) -> Result<Output, EngineError> {
        debug!("yt-dlp {:?}", args);

        let mut command = Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| EngineError::TimedOut(limit))?,
            None => command.output().await,
        }
        .map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                EngineError::NotInstalled(self.binary.clone())
            } else {
                EngineError::Spawn(error)
            }
        })?;

        if !output.status.success() {
            return Err(EngineError::Failed(run_error_message(&output.stderr)));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaEngine for YtDlp {
    async fn probe(&self, url: &str, purpose: ProbePurpose) -> Result<RawMedia, EngineError> {
        let output = self.run(probe_args(url, purpose)).await?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn download(&self, job: &DownloadJob) -> Result<DownloadOutcome, EngineError> {
        let output = self.run(download_args(job, &self.download_root)).await?;
        let report = DownloadReport::parse(&output.stdout);

        match job.policy {
            OutputPolicy::Playlist => {
                let relative_path = match report.files.first() {
                    Some(first) => {
                        let file = resolve_within_root(&self.download_root, Path::new(first))
                            .await?;
                        file.parent().map(Path::to_path_buf).unwrap_or_default()
                    }
                    None => report
                        .playlist_title
                        .as_deref()
                        .map(PathBuf::from)
                        .ok_or(EngineError::MissingOutput)?,
                };

                Ok(DownloadOutcome {
                    relative_path,
                    title: report.playlist_title,
                })
            }
            OutputPolicy::Single | OutputPolicy::Audio => {
                let printed = report.files.last().ok_or(EngineError::MissingOutput)?;
                let relative_path =
                    resolve_within_root(&self.download_root, Path::new(printed)).await?;

                Ok(DownloadOutcome {
                    relative_path,
                    title: report.title,
                })
            }
        }
    }
}

fn probe_args(url: &str, purpose: ProbePurpose) -> Vec<String> {
    let mut args = vec!["-J".to_string(), "--no-warnings".to_string()];
    if purpose == ProbePurpose::Formats {
        args.push("--extractor-args".to_string());
        args.push("youtube:skip=dash".to_string());
    }
    args.push(url.to_string());
    args
}

fn download_args(job: &DownloadJob, root: &Path) -> Vec<String> {
    let mut args = vec![
        "--no-warnings".to_string(),
        "--no-simulate".to_string(),
        "-f".to_string(),
        job.selector.clone(),
        "-o".to_string(),
        job.policy.output_template(root).to_string_lossy().into_owned(),
        "--print".to_string(),
        format!("after_move:{FILE_MARKER}%(filepath)s"),
    ];

    match job.policy {
        OutputPolicy::Playlist => {
            args.push("--yes-playlist".to_string());
            args.push("--merge-output-format".to_string());
            args.push(job.policy.container().to_string());
            args.push("--print".to_string());
            args.push(format!("playlist:{PLAYLIST_MARKER}%(title)s"));
        }
        OutputPolicy::Single => {
            args.push("--no-playlist".to_string());
            args.push("--merge-output-format".to_string());
            args.push(job.policy.container().to_string());
            args.push("--print".to_string());
            args.push(format!("after_move:{TITLE_MARKER}%(title)s"));
        }
        OutputPolicy::Audio => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(job.policy.container().to_string());
            args.push("--print".to_string());
            args.push(format!("after_move:{TITLE_MARKER}%(title)s"));
        }
    }

    args.push(job.url.clone());
    args
}

/// Lines yt-dlp printed through the `--print` templates of a download.
#[derive(Debug, Default, PartialEq)]
struct DownloadReport {
    files: Vec<String>,
    title: Option<String>,
    playlist_title: Option<String>,
}

impl DownloadReport {
    fn parse(stdout: &[u8]) -> Self {
        let mut report = Self::default();

        for line in String::from_utf8_lossy(stdout).lines() {
            if let Some(path) = line.strip_prefix(FILE_MARKER) {
                report.files.push(path.trim().to_string());
            } else if let Some(title) = line.strip_prefix(TITLE_MARKER) {
                report.title = Some(title.trim().to_string());
            } else if let Some(title) = line.strip_prefix(PLAYLIST_MARKER) {
                report.playlist_title = Some(title.trim().to_string());
            }
        }

        report
    }
}

/// Reduces yt-dlp's stderr to the line worth showing a user.
fn run_error_message(stderr: &[u8]) -> String {
    let message = String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("yt-dlp could not complete the operation")
        .to_string();

    if message.to_ascii_lowercase().contains("unsupported url") {
        format!("Unsupported or invalid URL ({message})")
    } else {
        message
    }
}

/// Resolves a path printed by yt-dlp and returns it relative to the download root.
async fn resolve_within_root(root: &Path, printed: &Path) -> Result<PathBuf, EngineError> {
    let canonical_root = tokio::fs::canonicalize(root).await?;

    let canonical = match tokio::fs::canonicalize(printed).await {
        Ok(path) => path,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(EngineError::MissingOutput);
        }
        Err(error) => return Err(EngineError::Io(error)),
    };

    match canonical.strip_prefix(&canonical_root) {
        Ok(relative) => Ok(relative.to_path_buf()),
        Err(_) => {
            warn!(
                "Blocked a downloaded file outside the download directory: {:?}",
                canonical
            );
            Err(EngineError::OutsideRoot(canonical))
        }
    }
}
