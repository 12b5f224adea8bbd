//! ffmpeg-based capture backend for Unix hosts

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::application::permission::PermissionGate;
use crate::application::ports::{CaptureBackend, CaptureError, PermissionDecision};
use crate::domain::recording::{Artifact, AudioMimeType, StateError};

use super::BackendPhase;

/// Captures one take by running the host's ffmpeg against the default
/// PulseAudio source.
///
/// Pause and resume map onto SIGSTOP/SIGCONT, so the encoder is frozen
/// rather than fed silence. Elapsed time comes from ffmpeg's own
/// `-progress` reports, which measure encoded media time and therefore
/// exclude paused intervals on their own.
pub struct NativeCaptureBackend {
    gate: Arc<PermissionGate>,
    temp_dir: PathBuf,
    phase: Mutex<BackendPhase>,
    process: Mutex<Option<Child>>,
    output_path: Mutex<Option<PathBuf>>,
    paused: Arc<AtomicBool>,
    elapsed_ms: Arc<AtomicU64>,
}

impl NativeCaptureBackend {
    pub fn new(gate: Arc<PermissionGate>, temp_dir: PathBuf) -> Self {
        Self {
            gate,
            temp_dir,
            phase: Mutex::new(BackendPhase::Idle),
            process: Mutex::new(None),
            output_path: Mutex::new(None),
            paused: Arc::new(AtomicBool::new(false)),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    fn set_phase(&self, to: BackendPhase) {
        *self.phase.lock().unwrap() = to;
    }

    fn fresh_output_path(&self) -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.temp_dir
            .join(format!("voice-morph-{}-{}.ogg", std::process::id(), stamp))
    }
}

#[async_trait]
impl CaptureBackend for NativeCaptureBackend {
    async fn request_access(&self) -> PermissionDecision {
        self.gate.request().await
    }

    async fn start(&self) -> Result<(), CaptureError> {
        if !self.gate.is_granted().await {
            return Err(CaptureError::PermissionDenied);
        }
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase != BackendPhase::Idle {
                return Err(StateError::new("start", *phase).into());
            }
            *phase = BackendPhase::Capturing;
        }

        let path = self.fresh_output_path();
        let args = build_capture_args(&path);
        let mut child = match spawn_ffmpeg(&args) {
            Ok(child) => child,
            Err(e) => {
                self.set_phase(BackendPhase::Done);
                return Err(e);
            }
        };

        // Drain the progress pipe into the elapsed counter. The task ends on
        // its own when ffmpeg closes stdout.
        if let Some(stdout) = child.stdout.take() {
            let elapsed = self.elapsed_ms.clone();
            let paused = self.paused.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(ms) = parse_progress_millis(&line) {
                        if !paused.load(Ordering::SeqCst) {
                            elapsed.store(ms, Ordering::SeqCst);
                        }
                    }
                }
            });
        }

        // ffmpeg exits almost immediately when the source is unavailable
        tokio::time::sleep(Duration::from_millis(100)).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut detail = String::new();
                if let Some(mut stderr) = child.stderr.take() {
                    let mut raw = Vec::new();
                    let _ = stderr.read_to_end(&mut raw).await;
                    detail = String::from_utf8_lossy(&raw).trim().to_string();
                }
                let _ = tokio::fs::remove_file(&path).await;
                self.set_phase(BackendPhase::Done);
                let message = if detail.is_empty() {
                    format!("ffmpeg exited during startup ({status})")
                } else {
                    format!("ffmpeg exited during startup: {detail}")
                };
                return Err(CaptureError::StartFailed(message));
            }
            Ok(None) => {}
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                self.set_phase(BackendPhase::Done);
                return Err(CaptureError::StartFailed(format!(
                    "failed to check capture process: {e}"
                )));
            }
        }

        debug!(backend = "native", path = %path.display(), "capture started");
        *self.output_path.lock().unwrap() = Some(path);
        *self.process.lock().unwrap() = Some(child);
        Ok(())
    }

    async fn pause(&self) -> Result<(), CaptureError> {
        {
            let phase = self.phase.lock().unwrap();
            if *phase != BackendPhase::Capturing {
                return Err(StateError::new("pause", *phase).into());
            }
        }

        // Guard goes up first so a buffered progress line cannot bump the
        // counter after the stop signal lands
        self.paused.store(true, Ordering::SeqCst);
        {
            let process = self.process.lock().unwrap();
            let Some(child) = process.as_ref() else {
                self.paused.store(false, Ordering::SeqCst);
                return Err(CaptureError::DeviceFailed(
                    "capture process missing".to_string(),
                ));
            };
            if let Err(e) = send_signal(child, Signal::SIGSTOP) {
                self.paused.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        self.set_phase(BackendPhase::Paused);
        debug!(backend = "native", "capture paused");
        Ok(())
    }

    async fn resume(&self) -> Result<(), CaptureError> {
        {
            let phase = self.phase.lock().unwrap();
            if *phase != BackendPhase::Paused {
                return Err(StateError::new("resume", *phase).into());
            }
        }

        {
            let process = self.process.lock().unwrap();
            let Some(child) = process.as_ref() else {
                return Err(CaptureError::DeviceFailed(
                    "capture process missing".to_string(),
                ));
            };
            send_signal(child, Signal::SIGCONT)?;
        }
        self.paused.store(false, Ordering::SeqCst);

        self.set_phase(BackendPhase::Capturing);
        debug!(backend = "native", "capture resumed");
        Ok(())
    }

    async fn stop(&self) -> Result<Artifact, CaptureError> {
        {
            let mut phase = self.phase.lock().unwrap();
            match *phase {
                BackendPhase::Capturing | BackendPhase::Paused => *phase = BackendPhase::Done,
                other => return Err(StateError::new("stop", other).into()),
            }
        }

        let child = self.process.lock().unwrap().take();
        let Some(child) = child else {
            return Err(CaptureError::FinalizeFailed(
                "capture process already gone".to_string(),
            ));
        };

        // A stopped process cannot act on SIGINT, so lift the stop first
        if self.paused.swap(false, Ordering::SeqCst) {
            let _ = send_signal(&child, Signal::SIGCONT);
        }
        // Graceful shutdown lets ffmpeg finish the Ogg container
        let _ = send_signal(&child, Signal::SIGINT);

        let output = child.wait_with_output().await.map_err(|e| {
            CaptureError::FinalizeFailed(format!("failed to wait for capture process: {e}"))
        })?;

        let path = self.output_path.lock().unwrap().take();
        let Some(path) = path else {
            return Err(CaptureError::FinalizeFailed(
                "recording file path missing".to_string(),
            ));
        };

        // ffmpeg exits non-zero on SIGINT, so judge success by the file
        let wrote_audio = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !wrote_audio {
            let _ = tokio::fs::remove_file(&path).await;
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if detail.is_empty() {
                "no audio was written".to_string()
            } else {
                format!("no audio was written: {detail}")
            };
            return Err(CaptureError::FinalizeFailed(message));
        }

        let duration = self.elapsed_ms.load(Ordering::SeqCst);
        debug!(
            backend = "native",
            path = %path.display(),
            duration_ms = duration,
            "capture finalized"
        );
        Ok(Artifact::from_file(path, duration, AudioMimeType::Ogg))
    }

    async fn cancel(&self) -> Result<(), CaptureError> {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase == BackendPhase::Done {
                return Err(StateError::new("cancel", *phase).into());
            }
            *phase = BackendPhase::Done;
        }
        self.paused.store(false, Ordering::SeqCst);

        let child = self.process.lock().unwrap().take();
        if let Some(mut child) = child {
            // SIGKILL reaps even a SIGSTOPped process
            if child.start_kill().is_ok() {
                let _ = child.wait().await;
            }
        }

        let path = self.output_path.lock().unwrap().take();
        if let Some(path) = path {
            let _ = tokio::fs::remove_file(&path).await;
        }

        debug!(backend = "native", "capture cancelled");
        Ok(())
    }

    fn elapsed_millis(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }

    fn kind(&self) -> &'static str {
        "native"
    }
}

/// Build the ffmpeg argument list for capturing the default PulseAudio
/// source into an Opus-in-Ogg file at `output_path`.
fn build_capture_args(output_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "pulse".to_string(),
        "-i".to_string(),
        "default".to_string(),
        "-ar".to_string(),
        "16000".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-c:a".to_string(),
        "libopus".to_string(),
        "-b:a".to_string(),
        "16k".to_string(),
        "-application".to_string(),
        "voip".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

fn spawn_ffmpeg(args: &[String]) -> Result<Child, CaptureError> {
    Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CaptureError::StartFailed(
                    "ffmpeg not found. Install ffmpeg or select the stream backend".to_string(),
                )
            } else {
                CaptureError::StartFailed(format!("failed to spawn ffmpeg: {e}"))
            }
        })
}

fn send_signal(child: &Child, signal: Signal) -> Result<(), CaptureError> {
    let Some(pid) = child.id() else {
        return Err(CaptureError::DeviceFailed(
            "capture process already exited".to_string(),
        ));
    };
    signal::kill(Pid::from_raw(pid as i32), signal).map_err(|e| {
        CaptureError::DeviceFailed(format!("failed to signal capture process: {e}"))
    })
}

/// Parse one line of ffmpeg `-progress` output into captured milliseconds.
///
/// Progress blocks report `out_time_us` (and `out_time_ms`, which despite
/// its name is also microseconds). Returns `None` for every other key and
/// for the `N/A` placeholder emitted before the first frame.
fn parse_progress_millis(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    if key != "out_time_us" && key != "out_time_ms" {
        return None;
    }
    let micros: u64 = value.trim().parse().ok()?;
    Some(micros / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_args_record_from_default_pulse_source() {
        let args = build_capture_args(Path::new("/tmp/take.ogg"));

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "pulse");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "default");
    }

    #[test]
    fn capture_args_encode_voice_tuned_opus() {
        let args = build_capture_args(Path::new("/tmp/take.ogg"));

        let codec = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[codec + 1], "libopus");
        let rate = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[rate + 1], "16000");
        let app = args.iter().position(|a| a == "-application").unwrap();
        assert_eq!(args[app + 1], "voip");
    }

    #[test]
    fn capture_args_stream_progress_to_stdout() {
        let args = build_capture_args(Path::new("/tmp/take.ogg"));

        let progress = args.iter().position(|a| a == "-progress").unwrap();
        assert_eq!(args[progress + 1], "pipe:1");
        assert!(args.contains(&"-nostats".to_string()));
    }

    #[test]
    fn capture_args_end_with_output_path() {
        let args = build_capture_args(Path::new("/tmp/take.ogg"));
        assert_eq!(args.last().unwrap(), "/tmp/take.ogg");
        // -y precedes the path so a stale file never aborts the run
        assert_eq!(args[args.len() - 2], "-y");
    }

    #[test]
    fn progress_line_with_microsecond_time_parses() {
        assert_eq!(parse_progress_millis("out_time_us=2500000"), Some(2500));
        assert_eq!(parse_progress_millis("out_time_ms=2500000"), Some(2500));
    }

    #[test]
    fn progress_placeholder_before_first_frame_is_skipped() {
        assert_eq!(parse_progress_millis("out_time_us=N/A"), None);
    }

    #[test]
    fn unrelated_progress_keys_are_skipped() {
        assert_eq!(parse_progress_millis("frame=30"), None);
        assert_eq!(parse_progress_millis("bitrate=12.3kbits/s"), None);
        assert_eq!(parse_progress_millis("progress=continue"), None);
        assert_eq!(parse_progress_millis(""), None);
    }

    #[test]
    fn negative_progress_time_is_skipped() {
        assert_eq!(parse_progress_millis("out_time_us=-125000"), None);
    }
}
