//! Audio output collaborator.
//!
//! [`AudioBackend`] is the narrow interface the playback controller talks
//! to. [`RodioBackend`] implements it on top of rodio. The rodio output
//! stream is not `Send`, so it lives on a dedicated audio thread and the
//! backend handle only holds a command channel to it.

use log::{debug, error, info, warn};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("audio device error: {0}")]
    Device(String),

    #[error("nothing loaded")]
    NothingLoaded,

    #[error("audio thread is gone")]
    Disconnected,
}

/// Load/play/stop/volume, in the shape the controller needs.
///
/// Calls are synchronous and may come from any thread; implementations
/// serialize them internally.
pub trait AudioBackend: Send {
    /// Replace whatever is loaded with `path`, paused.
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;
    /// Start the loaded file.
    fn play(&mut self) -> Result<(), AudioError>;
    /// Halt and unload. No-op when idle.
    fn stop(&mut self);
    /// `level` is already clamped to `[0.0, 1.0]` by the caller.
    fn set_volume(&mut self, level: f32);
    fn volume(&self) -> f32;
}

enum AudioCommand {
    Load(PathBuf, mpsc::Sender<Result<(), AudioError>>),
    Play(mpsc::Sender<Result<(), AudioError>>),
    Stop,
    SetVolume(f32),
    Volume(mpsc::Sender<f32>),
    Shutdown,
}

/// rodio-backed output on the default device.
pub struct RodioBackend {
    tx: mpsc::Sender<AudioCommand>,
    handle: Option<thread::JoinHandle<()>>,
    // Last value set; answered if the audio thread has died.
    volume: f32,
}

impl RodioBackend {
    /// Open the default output device on a new audio thread.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::Device`] if no output stream can be opened.
    pub fn spawn(initial_volume: f32) -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("moodplay-audio".to_string())
            .spawn(move || audio_thread(rx, ready_tx, initial_volume))
            .map_err(|e| AudioError::Device(format!("failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio output ready");
                Ok(Self {
                    tx,
                    handle: Some(handle),
                    volume: initial_volume,
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::Disconnected)
            }
        }
    }

    fn request(
        &self,
        make: impl FnOnce(mpsc::Sender<Result<(), AudioError>>) -> AudioCommand,
    ) -> Result<(), AudioError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| AudioError::Disconnected)?;
        reply_rx.recv().map_err(|_| AudioError::Disconnected)?
    }
}

impl AudioBackend for RodioBackend {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        self.request(|reply| AudioCommand::Load(path.to_path_buf(), reply))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.request(AudioCommand::Play)
    }

    fn stop(&mut self) {
        if self.tx.send(AudioCommand::Stop).is_err() {
            warn!("Audio thread gone while stopping");
        }
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level;
        if self.tx.send(AudioCommand::SetVolume(level)).is_err() {
            warn!("Audio thread gone while setting volume");
        }
    }

    fn volume(&self) -> f32 {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(AudioCommand::Volume(reply_tx)).is_err() {
            return self.volume;
        }
        reply_rx.recv().unwrap_or(self.volume)
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

fn audio_thread(
    rx: mpsc::Receiver<AudioCommand>,
    ready: mpsc::Sender<Result<(), AudioError>>,
    mut volume: f32,
) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Device(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    // One sink per loaded file; dropping it silences the old one.
    let mut sink: Option<Sink> = None;

    while let Ok(command) = rx.recv() {
        match command {
            AudioCommand::Load(path, reply) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                let result = open_source(&path).and_then(|source| {
                    let new_sink = Sink::try_new(&stream_handle)
                        .map_err(|e| AudioError::Device(e.to_string()))?;
                    new_sink.pause();
                    new_sink.set_volume(volume);
                    new_sink.append(source);
                    sink = Some(new_sink);
                    Ok(())
                });
                debug!("Loaded {}: {}", path.display(), result.is_ok());
                let _ = reply.send(result);
            }
            AudioCommand::Play(reply) => {
                let result = match &sink {
                    Some(s) => {
                        s.play();
                        Ok(())
                    }
                    None => Err(AudioError::NothingLoaded),
                };
                let _ = reply.send(result);
            }
            AudioCommand::Stop => {
                if let Some(old) = sink.take() {
                    old.stop();
                    debug!("Stopped playback");
                }
            }
            AudioCommand::SetVolume(level) => {
                volume = level;
                if let Some(s) = &sink {
                    s.set_volume(level);
                }
            }
            AudioCommand::Volume(reply) => {
                let current = sink.as_ref().map_or(volume, Sink::volume);
                let _ = reply.send(current);
            }
            AudioCommand::Shutdown => break,
        }
    }

    debug!("Audio thread exiting");
}

fn open_source(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
