use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rand::seq::IndexedRandom;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

use crate::assets::{has_extension, list_files};

const CLIP_EXTENSIONS: &[&str] = &["wav"];

/// Reads every `.wav` clip in `dir` into memory.
pub fn load_clips(dir: &Path) -> Result<Vec<Arc<[u8]>>> {
    let mut clips = Vec::new();
    for path in list_files(dir, CLIP_EXTENSIONS)? {
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read clip {}", path.display()))?;
        clips.push(Arc::from(bytes));
    }
    Ok(clips)
}

/// Scratch sound effects played on qualifying swipes.
pub struct ScratchDeck {
    dir: PathBuf,
    clips: Vec<Arc<[u8]>>,
    output: Option<(OutputStream, OutputStreamHandle)>,
    watcher: Option<RecommendedWatcher>,
    changes_rx: Option<Receiver<notify::Result<notify::Event>>>,
}

impl ScratchDeck {
    /// Loads clips and opens the default audio device. Both failures are
    /// tolerated; the deck just stays silent.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let mut deck = Self::silent(dir);
        match OutputStream::try_default() {
            Ok(output) => deck.output = Some(output),
            Err(err) => warn!("No audio output, scratches will be silent: {err}"),
        }
        deck
    }

    pub fn silent(dir: impl Into<PathBuf>) -> Self {
        let mut deck = Self {
            dir: dir.into(),
            clips: Vec::new(),
            output: None,
            watcher: None,
            changes_rx: None,
        };
        if let Err(err) = deck.reload() {
            warn!("Scratch sounds unavailable: {err:#}");
        }
        deck
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn reload(&mut self) -> Result<usize> {
        self.clips = load_clips(&self.dir)?;
        info!(
            "Loaded {} scratch clip(s) from {}",
            self.clip_count(),
            self.dir.display()
        );
        Ok(self.clip_count())
    }

    pub fn enable_hot_reload(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        if !self.dir.exists() {
            return Err(anyhow!(
                "Sound directory {} does not exist",
                self.dir.display()
            ));
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        self.changes_rx = Some(rx);
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Reloads the clip set if the watcher reported a change to a clip file.
    pub fn poll_hot_reload(&mut self) -> bool {
        let mut relevant = false;
        if let Some(rx) = self.changes_rx.as_ref() {
            while let Ok(event) = rx.try_recv() {
                match event {
                    Ok(evt) => {
                        relevant |= evt
                            .paths
                            .iter()
                            .any(|p| has_extension(p, CLIP_EXTENSIONS));
                    }
                    Err(err) => warn!("Sound watcher error: {err}"),
                }
            }
        }

        if !relevant {
            return false;
        }
        match self.reload() {
            Ok(_) => true,
            Err(err) => {
                warn!("Failed to reload scratch sounds: {err:#}");
                false
            }
        }
    }

    pub fn play_random(&self) {
        let Some((_, handle)) = self.output.as_ref() else {
            return;
        };
        let Some(clip) = self.clips.choose(&mut rand::rng()) else {
            return;
        };

        let source = match Decoder::new(Cursor::new(Arc::clone(clip))) {
            Ok(source) => source,
            Err(err) => {
                warn!("Could not decode scratch clip: {err}");
                return;
            }
        };
        if let Err(err) = handle.play_raw(source.convert_samples()) {
            warn!("Could not play scratch clip: {err}");
        }
    }
}
