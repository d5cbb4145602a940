use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

use eframe::egui::ColorImage;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album_cover_url: String,
}

/// Images derived from one album cover.
#[derive(Debug, Clone)]
pub struct VisualAssets {
    pub thumbnail: ColorImage,
    pub overlay: ColorImage,
}

/// Immutable pairing of a track with the assets built from its cover.
/// Replaced wholesale; never edited after publication.
#[derive(Debug)]
pub struct MetadataSnapshot {
    pub generation: u64,
    pub track: TrackInfo,
    pub assets: Option<Arc<VisualAssets>>,
}

/// The only state shared between the refresh worker and the render loop.
#[derive(Debug, Default)]
pub struct MetadataCache {
    current: RwLock<Option<Arc<MetadataSnapshot>>>,
    generations: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published snapshot. Holding the returned `Arc` keeps the
    /// track/assets pair consistent even if a newer one is published meanwhile.
    pub fn snapshot(&self) -> Option<Arc<MetadataSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current snapshot; last writer wins.
    pub fn publish(&self, track: TrackInfo, assets: Option<Arc<VisualAssets>>) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Arc::new(MetadataSnapshot {
            generation,
            track,
            assets,
        });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        generation
    }
}
