use std::{
    io,
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        mpsc::{self, RecvTimeoutError, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    metadata::{MetadataCache, VisualAssets},
    overlay::{build_visual_assets, decode_cover, OverlayOptions},
    playback::{PlaybackError, PlaybackService},
};

/// Where the refresh worker is. `Idle` only until the first cycle starts;
/// afterwards `Success` or `Failure` describe the last cycle and hold while
/// the worker waits for the next trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RefreshPhase {
    Idle = 0,
    Fetching = 1,
    Success = 2,
    Failure = 3,
}

impl RefreshPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RefreshPhase::Fetching,
            2 => RefreshPhase::Success,
            3 => RefreshPhase::Failure,
            _ => RefreshPhase::Idle,
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("album art could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published(u64),
    Unchanged,
}

/// One refresh attempt. The cache is written at most once, at the very end,
/// and only when everything needed for the new snapshot was obtained.
pub fn run_refresh_cycle(
    service: &dyn PlaybackService,
    cache: &MetadataCache,
    options: &OverlayOptions,
) -> Result<RefreshOutcome, RefreshError> {
    let track = service.fetch_now_playing()?;
    let current = cache.snapshot();

    if let Some(snapshot) = current.as_ref() {
        if snapshot.track == track {
            return Ok(RefreshOutcome::Unchanged);
        }
    }

    let reusable = current
        .as_ref()
        .filter(|snapshot| snapshot.track.album_cover_url == track.album_cover_url)
        .and_then(|snapshot| snapshot.assets.clone());

    let assets: Option<Arc<VisualAssets>> = if track.album_cover_url.is_empty() {
        None
    } else if let Some(existing) = reusable {
        Some(existing)
    } else {
        let bytes = service.fetch_cover(&track.album_cover_url)?;
        let cover = decode_cover(&bytes)?;
        Some(Arc::new(build_visual_assets(&cover, options)))
    };

    Ok(RefreshOutcome::Published(cache.publish(track, assets)))
}

enum RefreshCommand {
    Fetch,
    Shutdown,
}

/// Background worker that keeps the metadata cache current.
///
/// A cycle runs right away, then every `interval`, and additionally whenever
/// [`RefreshCoordinator::request_refresh`] is called. Requests that pile up
/// while a cycle is in flight collapse into a single follow-up cycle.
pub struct RefreshCoordinator {
    request_tx: Sender<RefreshCommand>,
    phase: Arc<AtomicU8>,
    completed: Arc<AtomicU64>,
}

impl RefreshCoordinator {
    pub fn spawn(
        service: Arc<dyn PlaybackService>,
        cache: Arc<MetadataCache>,
        options: OverlayOptions,
        interval: Duration,
    ) -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let phase = Arc::new(AtomicU8::new(RefreshPhase::Idle as u8));
        let completed = Arc::new(AtomicU64::new(0));

        let worker_phase = Arc::clone(&phase);
        let worker_completed = Arc::clone(&completed);
        thread::Builder::new()
            .name("metadata-refresh".to_string())
            .spawn(move || {
                let mut next_due = Instant::now();
                loop {
                    let wait = next_due.saturating_duration_since(Instant::now());
                    match request_rx.recv_timeout(wait) {
                        Ok(RefreshCommand::Fetch) | Err(RecvTimeoutError::Timeout) => {}
                        Ok(RefreshCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            break
                        }
                    }

                    loop {
                        match request_rx.try_recv() {
                            Ok(RefreshCommand::Fetch) => continue,
                            Err(TryRecvError::Empty) => break,
                            Ok(RefreshCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                                return
                            }
                        }
                    }

                    worker_phase.store(RefreshPhase::Fetching as u8, Ordering::Release);
                    debug!("metadata refresh: fetching");
                    let finished = match run_refresh_cycle(service.as_ref(), &cache, &options) {
                        Ok(RefreshOutcome::Published(generation)) => {
                            if let Some(snapshot) = cache.snapshot() {
                                info!(
                                    "Now playing: {} - {} (snapshot {generation})",
                                    snapshot.track.artist, snapshot.track.title
                                );
                            }
                            RefreshPhase::Success
                        }
                        Ok(RefreshOutcome::Unchanged) => {
                            debug!("metadata refresh: unchanged");
                            RefreshPhase::Success
                        }
                        Err(RefreshError::Playback(PlaybackError::NotPlaying)) => {
                            debug!("metadata refresh: nothing playing");
                            RefreshPhase::Failure
                        }
                        Err(err) => {
                            warn!("Metadata refresh failed: {err}");
                            RefreshPhase::Failure
                        }
                    };
                    worker_phase.store(finished as u8, Ordering::Release);
                    worker_completed.fetch_add(1, Ordering::AcqRel);

                    next_due = Instant::now() + interval;
                }
            })?;

        Ok(Self {
            request_tx,
            phase,
            completed,
        })
    }

    /// Asks for an out-of-band cycle. Never blocks.
    pub fn request_refresh(&self) {
        if self.request_tx.send(RefreshCommand::Fetch).is_err() {
            warn!("Metadata refresh worker is gone; ignoring refresh request");
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        RefreshPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

impl Drop for RefreshCoordinator {
    fn drop(&mut self) {
        // an in-flight fetch is not cancelled; the worker exits once it returns
        let _ = self.request_tx.send(RefreshCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TrackInfo;
    use image::{codecs::png::PngEncoder, ImageEncoder, Rgba, RgbaImage};
    use std::sync::{atomic::AtomicUsize, Mutex};

    fn options() -> OverlayOptions {
        OverlayOptions {
            output_size: 32,
            hole_radius: 3.0,
            alpha: 204,
            thumbnail_size: 8,
        }
    }

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(16, 16, Rgba(color));
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(image.as_raw(), 16, 16, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    fn track(title: &str, cover: &str) -> TrackInfo {
        TrackInfo {
            title: title.to_string(),
            artist: "Artist".to_string(),
            album_cover_url: cover.to_string(),
        }
    }

    struct FakeService {
        track: Mutex<Result<TrackInfo, ()>>,
        cover: Mutex<Result<Vec<u8>, ()>>,
        now_playing_calls: AtomicUsize,
        cover_calls: AtomicUsize,
        gate: Option<Mutex<mpsc::Receiver<()>>>,
    }

    impl FakeService {
        fn new(track: TrackInfo, cover: Vec<u8>) -> Self {
            Self {
                track: Mutex::new(Ok(track)),
                cover: Mutex::new(Ok(cover)),
                now_playing_calls: AtomicUsize::new(0),
                cover_calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    impl PlaybackService for FakeService {
        fn fetch_now_playing(&self) -> Result<TrackInfo, PlaybackError> {
            self.now_playing_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            self.track
                .lock()
                .unwrap()
                .clone()
                .map_err(|_| PlaybackError::Malformed("boom".to_string()))
        }

        fn fetch_cover(&self, _url: &str) -> Result<Vec<u8>, PlaybackError> {
            self.cover_calls.fetch_add(1, Ordering::SeqCst);
            self.cover
                .lock()
                .unwrap()
                .clone()
                .map_err(|_| PlaybackError::Malformed("no cover".to_string()))
        }

        fn resume(&self) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn pause(&self) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn next_track(&self) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn previous_track(&self) -> Result<(), PlaybackError> {
            Ok(())
        }
    }

    #[test]
    fn success_publishes_track_and_assets_together() {
        let service = FakeService::new(track("a", "u1"), png_bytes([255, 0, 0, 255]));
        let cache = MetadataCache::new();
        let outcome = run_refresh_cycle(&service, &cache, &options()).unwrap();
        assert!(matches!(outcome, RefreshOutcome::Published(_)));

        let snap = cache.snapshot().unwrap();
        assert_eq!(snap.track.title, "a");
        let assets = snap.assets.as_ref().unwrap();
        assert_eq!(assets.overlay.size, [32, 32]);
        assert_eq!(assets.thumbnail.size, [8, 8]);
    }

    #[test]
    fn failed_track_fetch_leaves_cache_untouched() {
        let service = FakeService::new(track("a", "u1"), png_bytes([0, 255, 0, 255]));
        let cache = MetadataCache::new();
        run_refresh_cycle(&service, &cache, &options()).unwrap();
        let before = cache.snapshot().unwrap();

        *service.track.lock().unwrap() = Err(());
        assert!(run_refresh_cycle(&service, &cache, &options()).is_err());

        let after = cache.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn failed_cover_fetch_or_decode_leaves_cache_untouched() {
        let service = FakeService::new(track("a", "u1"), png_bytes([0, 0, 255, 255]));
        let cache = MetadataCache::new();
        run_refresh_cycle(&service, &cache, &options()).unwrap();
        let before = cache.snapshot().unwrap();

        *service.track.lock().unwrap() = Ok(track("b", "u2"));
        *service.cover.lock().unwrap() = Err(());
        assert!(matches!(
            run_refresh_cycle(&service, &cache, &options()),
            Err(RefreshError::Playback(_))
        ));

        *service.cover.lock().unwrap() = Ok(vec![1, 2, 3]);
        assert!(matches!(
            run_refresh_cycle(&service, &cache, &options()),
            Err(RefreshError::Decode(_))
        ));

        let after = cache.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.track.title, "a");
    }

    #[test]
    fn same_cover_is_reused_without_download() {
        let service = FakeService::new(track("a", "u1"), png_bytes([9, 9, 9, 255]));
        let cache = MetadataCache::new();
        run_refresh_cycle(&service, &cache, &options()).unwrap();
        let first_assets = cache.snapshot().unwrap().assets.clone().unwrap();

        *service.track.lock().unwrap() = Ok(track("a2", "u1"));
        run_refresh_cycle(&service, &cache, &options()).unwrap();

        let snap = cache.snapshot().unwrap();
        assert_eq!(snap.track.title, "a2");
        assert!(Arc::ptr_eq(&first_assets, snap.assets.as_ref().unwrap()));
        assert_eq!(service.cover_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identical_track_is_unchanged() {
        let service = FakeService::new(track("a", "u1"), png_bytes([9, 9, 9, 255]));
        let cache = MetadataCache::new();
        run_refresh_cycle(&service, &cache, &options()).unwrap();
        let generation = cache.snapshot().unwrap().generation;
        assert_eq!(
            run_refresh_cycle(&service, &cache, &options()).unwrap(),
            RefreshOutcome::Unchanged
        );
        assert_eq!(cache.snapshot().unwrap().generation, generation);
    }

    #[test]
    fn empty_cover_url_publishes_without_assets() {
        let service = FakeService::new(track("podcast", ""), Vec::new());
        let cache = MetadataCache::new();
        run_refresh_cycle(&service, &cache, &options()).unwrap();
        let snap = cache.snapshot().unwrap();
        assert!(snap.assets.is_none());
        assert_eq!(service.cover_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn overlapping_triggers_coalesce_into_one_cycle() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut fake = FakeService::new(track("a", ""), Vec::new());
        fake.gate = Some(Mutex::new(gate_rx));
        let service = Arc::new(fake);
        let cache = Arc::new(MetadataCache::new());

        let coordinator = RefreshCoordinator::spawn(
            service.clone(),
            Arc::clone(&cache),
            options(),
            Duration::from_secs(3600),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while service.now_playing_calls.load(Ordering::SeqCst) < 1 {
            assert!(Instant::now() < deadline, "initial cycle never started");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(coordinator.phase(), RefreshPhase::Fetching);

        for _ in 0..5 {
            coordinator.request_refresh();
        }
        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();

        while coordinator.completed_cycles() < 2 {
            assert!(Instant::now() < deadline, "follow-up cycle never finished");
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        assert_eq!(service.now_playing_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.snapshot().unwrap().track.title, "a");
    }

    fn wait_for_cycles(coordinator: &RefreshCoordinator, count: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while coordinator.completed_cycles() < count {
            assert!(Instant::now() < deadline, "refresh cycle never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn phase_reports_how_the_last_cycle_ended() {
        let service = Arc::new(FakeService::new(track("a", ""), Vec::new()));
        *service.track.lock().unwrap() = Err(());
        let cache = Arc::new(MetadataCache::new());
        let coordinator = RefreshCoordinator::spawn(
            service.clone(),
            Arc::clone(&cache),
            options(),
            Duration::from_secs(3600),
        )
        .unwrap();

        wait_for_cycles(&coordinator, 1);
        assert_eq!(coordinator.phase(), RefreshPhase::Failure);
        assert!(cache.snapshot().is_none());

        *service.track.lock().unwrap() = Ok(track("a", ""));
        coordinator.request_refresh();
        wait_for_cycles(&coordinator, 2);
        assert_eq!(coordinator.phase(), RefreshPhase::Success);
        assert_eq!(cache.snapshot().unwrap().track.title, "a");
    }

    #[test]
    fn request_refresh_does_not_block() {
        let (_gate_tx, gate_rx) = mpsc::channel::<()>();
        let mut fake = FakeService::new(track("a", ""), Vec::new());
        fake.gate = Some(Mutex::new(gate_rx));
        let coordinator = RefreshCoordinator::spawn(
            Arc::new(fake),
            Arc::new(MetadataCache::new()),
            options(),
            Duration::from_secs(3600),
        )
        .unwrap();

        let started = Instant::now();
        for _ in 0..100 {
            coordinator.request_refresh();
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
