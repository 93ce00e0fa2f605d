//! # Track Library Module
//!
//! Picks a song for a mood from a flat directory of audio files. A file is
//! tagged with a mood purely by its name: `sunny_happy_tune.mp3` is a happy
//! track. There is no index or cache; the directory is listed again on every
//! request so files can be added or removed while the player runs.

use crate::mood::Mood;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A playable file on disk, tagged with the mood it was selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub mood: Mood,
}

impl Track {
    /// File name for display; falls back to the full path.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Why no track could be chosen.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("no '{mood}' songs found in {}", dir.display())]
    NotFound { mood: Mood, dir: PathBuf },

    #[error("cannot read songs folder {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Flat directory of mood-tagged audio files.
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
}

impl Library {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every file whose lower-cased name contains the mood label, sorted by
    /// name. Subdirectories are neither listed nor descended into.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Io`] if the directory is missing or unreadable.
    pub fn tracks_for(&self, mood: Mood) -> Result<Vec<Track>, LibraryError> {
        let io_err = |source| LibraryError::Io {
            dir: self.dir.clone(),
            source,
        };

        let mut tracks = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.contains(mood.label()) {
                trace!("Candidate `{name}' for mood `{mood}'.");
                tracks.push(Track {
                    path: entry.path(),
                    mood,
                });
            }
        }

        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(tracks)
    }

    /// Pick a random track for `mood`.
    ///
    /// # Errors
    ///
    /// [`LibraryError::NotFound`] when no file name matches,
    /// [`LibraryError::Io`] when the directory cannot be listed.
    pub fn select_track(&self, mood: Mood) -> Result<Track, LibraryError> {
        self.select_track_with(mood, &mut thread_rng())
    }

    /// Same as [`Library::select_track`] with a caller-supplied RNG.
    pub fn select_track_with<R: Rng + ?Sized>(
        &self,
        mood: Mood,
        rng: &mut R,
    ) -> Result<Track, LibraryError> {
        let tracks = self.tracks_for(mood)?;
        debug!(
            "{} '{mood}' tracks in {}",
            tracks.len(),
            self.dir.display()
        );

        tracks
            .choose(rng)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound {
                mood,
                dir: self.dir.clone(),
            })
    }
}
