use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Sender},
        Mutex,
    },
    thread,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rodio::{Decoder, Sink};
use tokio::sync::oneshot;

use super::{clamp_volume, MediaProvider};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

enum AudioCommand {
    Open {
        path: PathBuf,
        volume: f32,
        reply: oneshot::Sender<Result<u64>>,
    },
    SetVolume {
        id: u64,
        volume: f32,
        reply: oneshot::Sender<Result<()>>,
    },
    Release {
        id: u64,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
}

/// Playback handle for one opened file.
///
/// Dropping an unreleased handle still stops its sink.
pub struct EngineHandle {
    id: u64,
    commands: Sender<AudioCommand>,
    released: bool,
}

impl EngineHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.commands.send(AudioCommand::Release {
                id: self.id,
                reply: None,
            });
        }
    }
}

/// An open request whose caller may stop waiting.
///
/// If dropped before the reply is read, the reply channel is closed so the
/// engine discards the track itself, and a track that already arrived is
/// released here.
struct PendingOpen {
    reply: oneshot::Receiver<Result<u64>>,
    commands: Sender<AudioCommand>,
    settled: bool,
}

impl Drop for PendingOpen {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.reply.close();
        if let Ok(Ok(id)) = self.reply.try_recv() {
            let _ = self.commands.send(AudioCommand::Release { id, reply: None });
        }
    }
}

/// rodio-backed [`MediaProvider`].
///
/// rodio's output stream is not `Send`, so a dedicated thread owns the
/// stream and every sink; the async side talks to it over a channel.
pub struct AudioEngine {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("audio engine lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                #[cfg(not(feature = "playback"))]
                log::warn!(
                    "Built without the `playback` feature: media is decoded but never reaches an output device"
                );

                let mut output = Output::default();
                let mut tracks: HashMap<u64, Track> = HashMap::new();
                let mut next_id: u64 = 1;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Open { path, volume, reply } => {
                            let result = output.open_track(&path, volume).map(|track| {
                                let id = next_id;
                                next_id += 1;
                                tracks.insert(id, track);
                                id
                            });
                            // Nobody is waiting for this track any more.
                            if let Err(Ok(id)) = reply.send(result) {
                                if let Some(track) = tracks.remove(&id) {
                                    track.sink.stop();
                                }
                                log_debug!("Dropped sink {id} from an abandoned open");
                            }
                        }
                        AudioCommand::SetVolume { id, volume, reply } => {
                            let result = match tracks.get(&id) {
                                Some(track) => {
                                    track.sink.set_volume(clamp_volume(volume));
                                    Ok(())
                                }
                                None => Err(anyhow!("no open sink {id}")),
                            };
                            let _ = reply.send(result);
                        }
                        AudioCommand::Release { id, reply } => {
                            let result = match tracks.remove(&id) {
                                Some(track) => {
                                    track.sink.stop();
                                    log_debug!("Released sink {id}");
                                    Ok(())
                                }
                                None => Err(anyhow!("sink {id} already released")),
                            };
                            if let Some(reply) = reply {
                                let _ = reply.send(result);
                            }
                        }
                    }
                }

                log_info!("Audio engine thread shutting down");
            })
            .context("failed to spawn audio engine thread")?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> AudioCommand,
    ) -> Result<T> {
        let tx = self.ensure_thread()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(build(reply_tx))
            .map_err(|err| anyhow!("failed to send command to audio engine: {err}"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("audio engine terminated unexpectedly"))?
    }
}

#[async_trait]
impl MediaProvider for AudioEngine {
    type Handle = EngineHandle;

    async fn open(&self, uri: &str, volume: f32) -> Result<EngineHandle> {
        let path = local_path(uri)?;
        let commands = self.ensure_thread()?;
        let (reply, reply_rx) = oneshot::channel();
        commands
            .send(AudioCommand::Open {
                path,
                volume: clamp_volume(volume),
                reply,
            })
            .map_err(|err| anyhow!("failed to send command to audio engine: {err}"))?;

        let mut pending = PendingOpen {
            reply: reply_rx,
            commands: commands.clone(),
            settled: false,
        };
        let reply = (&mut pending.reply).await;
        pending.settled = true;

        let id = reply.map_err(|_| anyhow!("audio engine terminated unexpectedly"))??;
        Ok(EngineHandle {
            id,
            commands,
            released: false,
        })
    }

    async fn set_volume(&self, handle: &EngineHandle, volume: f32) -> Result<()> {
        let id = handle.id;
        self.request(|reply| AudioCommand::SetVolume { id, volume, reply })
            .await
    }

    async fn release(&self, mut handle: EngineHandle) -> Result<()> {
        handle.released = true;
        let id = handle.id;
        self.request(|reply| AudioCommand::Release {
            id,
            reply: Some(reply),
        })
        .await
    }
}

/// Accepts plain paths and `file://` URIs.
fn local_path(uri: &str) -> Result<PathBuf> {
    let raw = uri.strip_prefix("file://").unwrap_or(uri);
    if raw.is_empty() {
        bail!("empty media location");
    }
    if raw.contains("://") {
        bail!("unsupported media location '{uri}'");
    }
    Ok(PathBuf::from(raw))
}

fn decode_looped(path: &Path) -> Result<rodio::decoder::LoopedDecoder<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let byte_len = file
        .metadata()
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();

    let mut builder = Decoder::<BufReader<File>>::builder()
        .with_data(BufReader::new(file))
        .with_byte_len(byte_len)
        .with_seekable(true);
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        builder = builder.with_hint(ext);
    }

    builder
        .build_looped()
        .map_err(|err| anyhow!("cannot decode {}: {err}", path.display()))
}

/// An open sink plus whatever keeps its samples flowing.
struct Track {
    sink: Sink,
    #[cfg(not(feature = "playback"))]
    _queue: rodio::queue::SourcesQueueOutput,
}

/// Where sinks send their samples.
#[cfg(feature = "playback")]
#[derive(Default)]
struct Output {
    stream: Option<rodio::OutputStream>,
}

#[cfg(feature = "playback")]
impl Output {
    fn open_track(&mut self, path: &Path, volume: f32) -> Result<Track> {
        let source = decode_looped(path)?;
        if self.stream.is_none() {
            let stream = rodio::OutputStreamBuilder::open_default_stream()
                .map_err(|err| anyhow!("failed to open audio output stream: {err}"))?;
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_ref() else {
            bail!("audio output stream unavailable");
        };
        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(volume);
        sink.append(source);
        Ok(Track { sink })
    }
}

/// Headless build: sources are decoded into a queue nobody drains.
#[cfg(not(feature = "playback"))]
#[derive(Default)]
struct Output;

#[cfg(not(feature = "playback"))]
impl Output {
    fn open_track(&mut self, path: &Path, volume: f32) -> Result<Track> {
        let source = decode_looped(path)?;
        let (sink, queue) = Sink::new();
        sink.set_volume(volume);
        sink.append(source);
        log_debug!("No output device in this build; {} stays silent", path.display());
        Ok(Track {
            sink,
            _queue: queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    /// Minimal mono 16-bit PCM WAV with a short burst of silence.
    #[cfg(not(feature = "playback"))]
    fn write_wav(path: &Path) {
        let samples: u32 = 800;
        let data_len = samples * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.extend(std::iter::repeat(0u8).take(data_len as usize));
        File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    #[test]
    fn local_path_accepts_file_uris() {
        assert_eq!(
            local_path("file:///cache/rain.mp3").unwrap(),
            PathBuf::from("/cache/rain.mp3")
        );
        assert_eq!(local_path("/x/y.wav").unwrap(), PathBuf::from("/x/y.wav"));
        assert!(local_path("https://example.com/a.mp3").is_err());
        assert!(local_path("").is_err());
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let engine = AudioEngine::new();
        assert!(engine.open("/definitely/not/here.mp3", 0.5).await.is_err());
    }

    #[tokio::test]
    async fn undecodable_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"this is not audio").unwrap();

        let engine = AudioEngine::new();
        assert!(engine.open(path.to_str().unwrap(), 0.5).await.is_err());
    }

    #[cfg(not(feature = "playback"))]
    #[tokio::test]
    async fn opens_adjusts_and_releases_a_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path);

        let engine = AudioEngine::new();
        let handle = engine.open(path.to_str().unwrap(), 0.7).await.unwrap();
        engine.set_volume(&handle, 0.2).await.unwrap();
        engine.release(handle).await.unwrap();
    }

    #[cfg(not(feature = "playback"))]
    async fn release_raw(engine: &AudioEngine, id: u64) -> Result<()> {
        engine
            .request(|reply| AudioCommand::Release {
                id,
                reply: Some(reply),
            })
            .await
    }

    #[cfg(not(feature = "playback"))]
    #[tokio::test]
    async fn abandoned_open_leaves_no_live_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path);
        let uri = path.to_str().unwrap();

        let engine = AudioEngine::new();
        // Polled once, then dropped; whichever way the race falls the
        // engine must end up without sink 1.
        let abandoned = tokio::time::timeout(std::time::Duration::ZERO, engine.open(uri, 0.7)).await;
        drop(abandoned);

        let err = release_raw(&engine, 1).await.unwrap_err();
        assert!(err.to_string().contains("already released"));

        let next = engine.open(uri, 0.7).await.unwrap();
        assert_eq!(next.id(), 2);
        engine.release(next).await.unwrap();
    }

    #[cfg(not(feature = "playback"))]
    #[tokio::test]
    async fn reply_arriving_after_caller_left_is_released() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path);

        let engine = AudioEngine::new();
        let id = engine
            .request(|reply| AudioCommand::Open {
                path: path.clone(),
                volume: 0.7,
                reply,
            })
            .await
            .unwrap();

        let (reply, reply_rx) = oneshot::channel();
        reply.send(Ok(id)).unwrap();
        drop(PendingOpen {
            reply: reply_rx,
            commands: engine.ensure_thread().unwrap(),
            settled: false,
        });

        assert!(release_raw(&engine, id).await.is_err());
    }
}
