//! In-process capture backend built on the cpal audio stack

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tracing::{debug, warn};

use crate::application::permission::PermissionGate;
use crate::application::ports::{CaptureBackend, CaptureError, PermissionDecision};
use crate::domain::recording::{Artifact, AudioMimeType, PauseAwareClock, StateError};

use super::BackendPhase;

/// Preferred capture rate. Voice content does not benefit from more.
const PREFERRED_SAMPLE_RATE: u32 = 16_000;

/// Captures one take through the default input device, accumulating mono
/// 16-bit samples in memory and finalizing them into a WAV buffer.
///
/// The cpal stream is not `Send`, so it lives on a dedicated worker thread
/// for the whole take. Pausing closes an append gate in the stream callback;
/// the device keeps running but its chunks are discarded, and a pause-aware
/// clock keeps the reported elapsed time honest.
pub struct StreamCaptureBackend {
    gate: Arc<PermissionGate>,
    phase: Mutex<BackendPhase>,
    capturing: Arc<AtomicBool>,
    accepting: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: AtomicU32,
    clock: Arc<PauseAwareClock>,
    elapsed_ms: Arc<AtomicU64>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl StreamCaptureBackend {
    pub fn new(gate: Arc<PermissionGate>) -> Self {
        Self {
            gate,
            phase: Mutex::new(BackendPhase::Idle),
            capturing: Arc::new(AtomicBool::new(false)),
            accepting: Arc::new(AtomicBool::new(false)),
            samples: Arc::new(Mutex::new(Vec::new())),
            sample_rate: AtomicU32::new(PREFERRED_SAMPLE_RATE),
            clock: Arc::new(PauseAwareClock::new()),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    fn set_phase(&self, to: BackendPhase) {
        *self.phase.lock().unwrap() = to;
    }

    async fn shut_down_worker(&self) {
        self.capturing.store(false, Ordering::SeqCst);
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = tokio::task::spawn_blocking(move || {
                let _ = handle.join();
            })
            .await;
        }
    }
}

#[async_trait]
impl CaptureBackend for StreamCaptureBackend {
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

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, CaptureError>>();
        let capturing = self.capturing.clone();
        let accepting = self.accepting.clone();
        let samples = self.samples.clone();
        self.capturing.store(true, Ordering::SeqCst);

        let handle = thread::spawn(move || {
            capture_worker(ready_tx, capturing, accepting, samples);
        });

        let ready = tokio::task::spawn_blocking(move || {
            ready_rx.recv_timeout(Duration::from_secs(5))
        })
        .await;
        let started = match ready {
            Ok(Ok(result)) => result,
            _ => Err(CaptureError::StartFailed(
                "audio worker did not report startup".to_string(),
            )),
        };

        let rate = match started {
            Ok(rate) => rate,
            Err(e) => {
                // The worker exits on its own once the flag drops
                self.capturing.store(false, Ordering::SeqCst);
                self.set_phase(BackendPhase::Done);
                return Err(e);
            }
        };

        self.sample_rate.store(rate, Ordering::SeqCst);
        *self.worker.lock().unwrap() = Some(handle);
        self.accepting.store(true, Ordering::SeqCst);
        self.clock.start();

        // Publish elapsed time while the take runs
        let capturing = self.capturing.clone();
        let clock = self.clock.clone();
        let elapsed = self.elapsed_ms.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            while capturing.load(Ordering::SeqCst) {
                ticker.tick().await;
                elapsed.store(clock.elapsed_millis(), Ordering::SeqCst);
            }
        });

        debug!(backend = "stream", sample_rate = rate, "capture started");
        Ok(())
    }

    async fn pause(&self) -> Result<(), CaptureError> {
        {
            let phase = self.phase.lock().unwrap();
            if *phase != BackendPhase::Capturing {
                return Err(StateError::new("pause", *phase).into());
            }
        }

        self.accepting.store(false, Ordering::SeqCst);
        self.clock.pause();

        self.set_phase(BackendPhase::Paused);
        debug!(backend = "stream", "capture paused");
        Ok(())
    }

    async fn resume(&self) -> Result<(), CaptureError> {
        {
            let phase = self.phase.lock().unwrap();
            if *phase != BackendPhase::Paused {
                return Err(StateError::new("resume", *phase).into());
            }
        }

        self.clock.resume();
        self.accepting.store(true, Ordering::SeqCst);

        self.set_phase(BackendPhase::Capturing);
        debug!(backend = "stream", "capture resumed");
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

        self.accepting.store(false, Ordering::SeqCst);
        let final_ms = self.clock.halt().as_millis() as u64;
        self.shut_down_worker().await;
        self.elapsed_ms.store(final_ms, Ordering::SeqCst);

        let captured = {
            let mut guard = self.samples.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        if captured.is_empty() {
            return Err(CaptureError::FinalizeFailed(
                "no audio samples were captured".to_string(),
            ));
        }

        let rate = self.sample_rate.load(Ordering::SeqCst);
        let bytes = tokio::task::spawn_blocking(move || encode_wav(&captured, rate))
            .await
            .map_err(|e| CaptureError::FinalizeFailed(format!("encoder task failed: {e}")))??;

        debug!(
            backend = "stream",
            bytes = bytes.len(),
            duration_ms = final_ms,
            "capture finalized"
        );
        Ok(Artifact::from_buffer(bytes, final_ms, AudioMimeType::Wav))
    }

    async fn cancel(&self) -> Result<(), CaptureError> {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase == BackendPhase::Done {
                return Err(StateError::new("cancel", *phase).into());
            }
            *phase = BackendPhase::Done;
        }

        self.accepting.store(false, Ordering::SeqCst);
        let _ = self.clock.halt();
        self.shut_down_worker().await;
        self.samples.lock().unwrap().clear();

        debug!(backend = "stream", "capture cancelled");
        Ok(())
    }

    fn elapsed_millis(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }

    fn kind(&self) -> &'static str {
        "stream"
    }
}

impl Drop for StreamCaptureBackend {
    fn drop(&mut self) {
        // Lets the worker thread exit if the backend is dropped mid-take
        self.accepting.store(false, Ordering::SeqCst);
        self.capturing.store(false, Ordering::SeqCst);
    }
}

/// Owns the cpal stream for the lifetime of one take.
///
/// Runs on a plain thread because `cpal::Stream` is not `Send`. Reports
/// startup through `ready`, then idles until the capturing flag drops.
fn capture_worker(
    ready: mpsc::Sender<Result<u32, CaptureError>>,
    capturing: Arc<AtomicBool>,
    accepting: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<i16>>>,
) {
    let (stream, sample_rate) = match open_input_stream(accepting, samples) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(CaptureError::StartFailed(format!(
            "failed to start audio stream: {e}"
        ))));
        return;
    }

    let _ = ready.send(Ok(sample_rate));

    while capturing.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

fn open_input_stream(
    accepting: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;

    let config = select_input_config(&device)?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    let stream_config: cpal::StreamConfig = config.config();

    let err_fn = |err: cpal::StreamError| warn!(error = %err, "audio input stream error");

    let stream = match config.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &_| {
                if accepting.load(Ordering::SeqCst) {
                    append_mono(&samples, data, channels);
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &_| {
                if accepting.load(Ordering::SeqCst) {
                    let converted: Vec<i16> =
                        data.iter().map(|&s| (s * 32767.0) as i16).collect();
                    append_mono(&samples, &converted, channels);
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::StartFailed(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    }
    .map_err(|e| CaptureError::StartFailed(format!("failed to open audio stream: {e}")))?;

    Ok((stream, sample_rate))
}

/// Pick an input configuration, preferring 16-bit integer formats and the
/// fewest channels, clamped toward the preferred voice sample rate.
fn select_input_config(
    device: &cpal::Device,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    let supported = device.supported_input_configs().map_err(|e| {
        CaptureError::StartFailed(format!("failed to query input configs: {e}"))
    })?;

    let format_rank = |format: SampleFormat| match format {
        SampleFormat::I16 => 0,
        _ => 1,
    };

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for range in supported {
        if !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
            continue;
        }
        let replace = match &best {
            None => true,
            Some(current) => {
                (format_rank(range.sample_format()), range.channels())
                    < (format_rank(current.sample_format()), current.channels())
            }
        };
        if replace {
            best = Some(range);
        }
    }

    match best {
        Some(range) => {
            let rate = PREFERRED_SAMPLE_RATE
                .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            Ok(range.with_sample_rate(cpal::SampleRate(rate)))
        }
        None => device
            .default_input_config()
            .map_err(|e| CaptureError::StartFailed(format!("no usable input config: {e}"))),
    }
}

fn append_mono(samples: &Mutex<Vec<i16>>, chunk: &[i16], channels: u16) {
    let mut buffer = samples.lock().unwrap();
    if channels <= 1 {
        buffer.extend_from_slice(chunk);
    } else {
        buffer.extend(mix_to_mono(chunk, channels));
    }
}

/// Average interleaved frames down to a single channel
fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| CaptureError::FinalizeFailed(format!("failed to start WAV writer: {e}")))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| CaptureError::FinalizeFailed(format!("failed to encode WAV: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| CaptureError::FinalizeFailed(format!("failed to finalize WAV: {e}")))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_to_mono_averages_stereo_pairs() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(mix_to_mono(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn mix_to_mono_handles_odd_tail() {
        let stereo = vec![10i16, 20, 30];
        assert_eq!(mix_to_mono(&stereo, 2), vec![15, 30]);
    }

    #[test]
    fn mix_to_mono_passes_single_channel_through() {
        let mono = vec![5i16, -5, 100];
        assert_eq!(mix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn mix_to_mono_handles_negative_samples() {
        let stereo = vec![-100i16, 100, -200, -400];
        assert_eq!(mix_to_mono(&stereo, 2), vec![0, -300]);
    }

    #[test]
    fn append_mono_downmixes_multichannel_chunks() {
        let buffer = Mutex::new(Vec::new());
        append_mono(&buffer, &[100, 200], 2);
        append_mono(&buffer, &[7, 8, 9], 1);
        assert_eq!(*buffer.lock().unwrap(), vec![150, 7, 8, 9]);
    }

    #[test]
    fn encoded_wav_parses_back_with_same_samples() {
        let samples = vec![0i16, 1000, -1000, i16::MAX, i16::MIN];
        let bytes = encode_wav(&samples, 16_000).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(&bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn encoded_wav_carries_riff_header() {
        let bytes = encode_wav(&[1i16, 2, 3], 44_100).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
