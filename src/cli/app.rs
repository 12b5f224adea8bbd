//! Main app runner for the record command

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::{CaptureBackendFactory, CaptureError, ConfigStore, ProviderError};
use crate::application::{
    PermissionGate, RecordingSession, RestyleCache, RestyleError, RestyleOrchestrator,
};
use crate::domain::config::AppConfig;
use crate::domain::recording::{Artifact, ArtifactLocator, Duration, SessionState};
use crate::domain::restyle::{RestyleRequest, VoiceStyleId};
use crate::infrastructure::capture::{
    CaptureConfig, CaptureEnvironment, EnvironmentBackendFactory,
};
use crate::infrastructure::{HttpRestyleProvider, StaticPermissionHost, XdgConfigStore};

use super::args::{RecordArgs, RecordOptions};
use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How one interactive take ended
enum TakeEnd {
    Stopped(Artifact),
    Cancelled,
    Failed(CaptureError),
}

/// Commands accepted on stdin while a take runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TakeCommand {
    Pause,
    Resume,
    Stop,
    Cancel,
    Unknown,
}

fn parse_take_command(line: &str) -> TakeCommand {
    match line.trim().to_lowercase().as_str() {
        "p" | "pause" => TakeCommand::Pause,
        "r" | "resume" => TakeCommand::Resume,
        "" | "s" | "stop" | "done" => TakeCommand::Stop,
        "c" | "cancel" | "q" | "quit" => TakeCommand::Cancel,
        _ => TakeCommand::Unknown,
    }
}

/// Run the record command
pub async fn run_record(args: RecordArgs) -> ExitCode {
    let mut presenter = Presenter::new();

    let options = match resolve_record_options(args).await {
        Ok(options) => options,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    // The API key is only needed when a style will be applied
    let provider = if options.style.is_some() {
        let api_key = match get_api_key().await {
            Ok(key) => key,
            Err(e) => {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        Some(match &options.api_url {
            Some(url) => HttpRestyleProvider::with_base_url(api_key, url),
            None => HttpRestyleProvider::new(api_key),
        })
    } else {
        None
    };

    let gate = Arc::new(PermissionGate::new(Arc::new(StaticPermissionHost::granted())));
    let factory = EnvironmentBackendFactory::new(options.backend, gate, CaptureConfig::default());
    let session = RecordingSession::new(factory);

    presenter.info("Controls: Enter stops, p pauses, r resumes, c cancels");
    presenter.start_spinner("Recording... 0:00");

    if let Err(e) = session.start().await {
        presenter.spinner_fail("Could not start recording");
        report_capture_error(&presenter, &e);
        return ExitCode::from(EXIT_ERROR);
    }

    let limit_ms = options.max_duration.as_millis();
    let artifact = match drive_take(&session, &mut presenter, limit_ms).await {
        TakeEnd::Stopped(artifact) => artifact,
        TakeEnd::Cancelled => {
            presenter.warn("Recording cancelled, nothing saved");
            return ExitCode::from(EXIT_SUCCESS);
        }
        TakeEnd::Failed(e) => {
            report_capture_error(&presenter, &e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.success(&format!(
        "Recorded {}",
        artifact.human_readable_duration()
    ));

    finish_take(artifact, options, provider, &mut presenter).await
}

/// Pump stdin commands, Ctrl-C, and the progress ticker until the take ends
async fn drive_take<F: CaptureBackendFactory>(
    session: &RecordingSession<F>,
    presenter: &mut Presenter,
    limit_ms: u64,
) -> TakeEnd {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(StdDuration::from_millis(200));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let command = match line {
                    Ok(Some(text)) => parse_take_command(&text),
                    // Closed stdin means no more commands are coming
                    Ok(None) | Err(_) => TakeCommand::Stop,
                };
                match command {
                    TakeCommand::Pause => match session.pause().await {
                        Ok(()) => {
                            let elapsed = session.elapsed_millis().await;
                            presenter.update_spinner(&format!(
                                "Paused at {} (r resumes)",
                                presenter.format_elapsed(elapsed)
                            ));
                        }
                        Err(e) => presenter.warn(&e.to_string()),
                    },
                    TakeCommand::Resume => {
                        if let Err(e) = session.resume().await {
                            presenter.warn(&e.to_string());
                        }
                    }
                    TakeCommand::Stop => return stop_take(session, presenter).await,
                    TakeCommand::Cancel => {
                        presenter.stop_spinner();
                        if let Err(e) = session.cancel().await {
                            return TakeEnd::Failed(e);
                        }
                        return TakeEnd::Cancelled;
                    }
                    TakeCommand::Unknown => {
                        presenter.warn("Commands: Enter stops, p pauses, r resumes, c cancels");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                presenter.stop_spinner();
                let _ = session.cancel().await;
                return TakeEnd::Cancelled;
            }
            _ = ticker.tick() => {
                if session.state().await == SessionState::Recording {
                    let elapsed = session.elapsed_millis().await;
                    if elapsed >= limit_ms {
                        presenter.warn("Max duration reached, stopping");
                        return stop_take(session, presenter).await;
                    }
                    presenter.update_recording_progress(elapsed, limit_ms);
                }
            }
        }
    }
}

async fn stop_take<F: CaptureBackendFactory>(
    session: &RecordingSession<F>,
    presenter: &mut Presenter,
) -> TakeEnd {
    presenter.update_spinner("Finishing...");
    match session.stop().await {
        Ok(artifact) => {
            presenter.stop_spinner();
            TakeEnd::Stopped(artifact)
        }
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            TakeEnd::Failed(e)
        }
    }
}

/// Persist the finished take, restyling it first when a style was requested
async fn finish_take(
    artifact: Artifact,
    options: RecordOptions,
    provider: Option<HttpRestyleProvider>,
    presenter: &mut Presenter,
) -> ExitCode {
    let (style, provider) = match (options.style.clone(), provider) {
        (Some(style), Some(provider)) => (style, provider),
        _ => {
            // No restyle requested; the raw take is the product
            let path = resolve_output_path(&options, None, artifact.mime_type().extension());
            return match persist_artifact(&artifact, &path).await {
                Ok(()) => {
                    presenter.success(&format!("Saved recording to {}", path.display()));
                    ExitCode::from(EXIT_SUCCESS)
                }
                Err(e) => {
                    presenter.error(&format!("Failed to save recording: {e}"));
                    ExitCode::from(EXIT_ERROR)
                }
            };
        }
    };

    let cache = Arc::new(RestyleCache::with_ttl(options.cache_ttl.as_std()));
    let orchestrator = RestyleOrchestrator::new(provider, cache);
    let request = RestyleRequest::new(style.clone())
        .with_enhancements(options.enhancements.iter().cloned());

    loop {
        presenter.start_spinner(&format!("Applying style '{}'...", style));
        match orchestrator.restyle(&artifact, &request).await {
            Ok(outcome) => {
                if outcome.from_cache {
                    presenter.spinner_success("Style applied (cached result)");
                } else {
                    presenter.spinner_success("Style applied");
                }

                let styled_path = resolve_output_path(
                    &options,
                    Some(style.as_str()),
                    outcome.artifact.mime_type().extension(),
                );
                if let Err(e) = persist_artifact(&outcome.artifact, &styled_path).await {
                    presenter.error(&format!("Failed to save restyled audio: {e}"));
                    return ExitCode::from(EXIT_ERROR);
                }
                presenter.success(&format!("Saved restyled audio to {}", styled_path.display()));

                if options.keep_original {
                    let raw_path =
                        resolve_output_path(&options, None, artifact.mime_type().extension());
                    match persist_artifact(&artifact, &raw_path).await {
                        Ok(()) => {
                            presenter.info(&format!("Raw recording kept at {}", raw_path.display()))
                        }
                        Err(e) => presenter.warn(&format!("Failed to keep raw recording: {e}")),
                    }
                } else if let ArtifactLocator::File(path) = artifact.locator() {
                    // Temp recording is no longer needed
                    let _ = tokio::fs::remove_file(path).await;
                }

                return ExitCode::from(EXIT_SUCCESS);
            }
            Err(e) => {
                presenter.spinner_fail("Restyle failed");
                report_restyle_error(presenter, &e);

                // The same request can be re-submitted; a prior failure
                // cached nothing
                if confirm_retry(presenter).await {
                    continue;
                }

                // Keep the raw take so the recording is not lost
                let raw_path =
                    resolve_output_path(&options, None, artifact.mime_type().extension());
                match persist_artifact(&artifact, &raw_path).await {
                    Ok(()) => {
                        presenter.warn(&format!("Raw recording kept at {}", raw_path.display()))
                    }
                    Err(persist_err) => {
                        presenter.error(&format!("Failed to save raw recording: {persist_err}"))
                    }
                }
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }
}

/// Ask whether to re-submit the failed restyle. Closed stdin declines.
async fn confirm_retry(presenter: &Presenter) -> bool {
    presenter.prompt("Retry the restyle? [y/N] ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => {
            let answer = line.trim().to_lowercase();
            answer == "y" || answer == "yes"
        }
        _ => false,
    }
}

/// Resolve where an artifact of this run should land.
///
/// An explicit `--output` names the run's final product: the restyled audio
/// when a style is in play, the raw take otherwise. Everything else gets a
/// generated name under the configured output directory.
fn resolve_output_path(
    options: &RecordOptions,
    style_tag: Option<&str>,
    extension: &str,
) -> PathBuf {
    let names_final_product = options.style.is_none() || style_tag.is_some();
    if names_final_product {
        if let Some(path) = &options.output {
            return path.clone();
        }
    }

    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let name = match style_tag {
        Some(tag) => format!("voice-morph-{stamp}-{tag}.{extension}"),
        None => format!("voice-morph-{stamp}.{extension}"),
    };
    dir.join(name)
}

/// Write an artifact to `path`. File-backed artifacts are moved, so this is
/// their last use; buffer-backed artifacts are written out.
async fn persist_artifact(artifact: &Artifact, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("create {}: {e}", parent.display()))?;
        }
    }

    match artifact.locator() {
        ArtifactLocator::Buffer(bytes) => tokio::fs::write(path, bytes)
            .await
            .map_err(|e| format!("write {}: {e}", path.display())),
        ArtifactLocator::File(source) => {
            if source == path {
                return Ok(());
            }
            // Rename fails across filesystems; fall back to copy
            if tokio::fs::rename(source, path).await.is_err() {
                tokio::fs::copy(source, path)
                    .await
                    .map_err(|e| format!("copy {} to {}: {e}", source.display(), path.display()))?;
                let _ = tokio::fs::remove_file(source).await;
            }
            Ok(())
        }
    }
}

fn report_capture_error(presenter: &Presenter, error: &CaptureError) {
    presenter.error(&error.to_string());
    match error {
        CaptureError::PermissionDenied => {
            presenter.info("Grant microphone access in your system settings and try again");
        }
        CaptureError::NoInputDevice => {
            presenter.info("Connect a microphone or select a different input device");
        }
        CaptureError::StartFailed(message) if message.contains("ffmpeg") => {
            presenter.info("Try the in-process backend: voice-morph record -b stream");
        }
        _ => {}
    }
}

fn report_restyle_error(presenter: &Presenter, error: &RestyleError) {
    presenter.error(&error.to_string());
    if let RestyleError::Provider(ProviderError::InvalidApiKey) = error {
        presenter.info("Check VOICEMORPH_API_KEY or run 'voice-morph config set api_key <key>'");
    }
}

/// Resolve record options by merging config sources with CLI arguments
async fn resolve_record_options(args: RecordArgs) -> Result<RecordOptions, String> {
    let cli_config = AppConfig {
        api_url: args.api_url.clone(),
        backend: args.backend.clone(),
        voice_style: args.style.clone(),
        max_duration: args.max_duration.clone(),
        ..Default::default()
    };
    let merged = load_merged_config(cli_config).await;

    let backend = merged
        .backend_or_default()
        .parse::<CaptureEnvironment>()
        .map_err(|e| e.to_string())?;

    let max_duration = match &merged.max_duration {
        Some(raw) => raw
            .parse::<Duration>()
            .map_err(|e| format!("invalid max duration '{raw}': {e}"))?,
        None => Duration::default_max_capture(),
    };

    let cache_ttl = match &merged.cache_ttl {
        Some(raw) => raw
            .parse::<Duration>()
            .map_err(|e| format!("invalid cache TTL '{raw}': {e}"))?,
        None => Duration::default_cache_ttl(),
    };

    Ok(RecordOptions {
        backend,
        style: merged.voice_style.map(VoiceStyleId::from),
        enhancements: args.enhance,
        output: args.output,
        output_dir: merged.output_dir.map(PathBuf::from),
        max_duration,
        cache_ttl,
        keep_original: args.keep_original,
        api_url: merged.api_url,
    })
}

/// Get API key from environment or config file
pub async fn get_api_key() -> Result<String, String> {
    // Check environment first
    if let Ok(key) = env::var("VOICEMORPH_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }

    // Check config file
    let store = XdgConfigStore::new();
    let config = store.load().await.unwrap_or_else(|_| AppConfig::empty());

    config.api_key.ok_or_else(|| {
        "Missing API key. Set VOICEMORPH_API_KEY or run 'voice-morph config set api_key <key>'"
            .to_string()
    })
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|_| AppConfig::empty());

    // Build env config
    let env_config = AppConfig {
        api_key: env::var("VOICEMORPH_API_KEY").ok().filter(|s| !s.is_empty()),
        api_url: env::var("VOICEMORPH_API_URL").ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}
