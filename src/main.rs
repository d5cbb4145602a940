mod assets;
mod config;
mod gesture;
mod layout;
mod metadata;
mod overlay;
mod playback;
mod refresh;
mod render;
mod rotation;
mod sound;
mod transport;
mod turntable;

use std::{
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context as _};
use clap::Parser;
use eframe::egui::{
    self, ColorImage, CursorIcon, FontId, Key, LayerId, PointerButton, TextureHandle,
    TextureOptions, ViewportBuilder, ViewportCommand,
};
use env_logger::Env;
use log::{error, info, warn};

use crate::{
    assets::{IconImages, RecordLibrary},
    config::Config,
    gesture::{DiscRegion, PointerEvent, SwipeThresholds},
    layout::{resolve_layout, Control},
    metadata::{MetadataCache, MetadataSnapshot, VisualAssets},
    overlay::OverlayOptions,
    playback::{PlaybackService, SpotifyClient},
    refresh::RefreshCoordinator,
    render::{compose_frame, layout_input, paint_frame, AlbumSprites, FrameInputs, FrameTextures, Sprite},
    rotation::RotationState,
    sound::ScratchDeck,
    transport::{TransportCommand, TransportWorker},
    turntable::{Reaction, Turntable},
};

/// Longest catch-up applied after a stalled frame, in nominal frames.
const MAX_FRAME_STEP: f32 = 15.0;

#[derive(Debug, Parser)]
#[command(name = "record_spinner", about = "Spinning vinyl record for whatever Spotify is playing")]
struct Cli {
    /// Run in a window instead of full screen
    #[arg(long)]
    windowed: bool,
}

struct IconTextures {
    play: TextureHandle,
    pause: TextureHandle,
    skip: TextureHandle,
    previous: TextureHandle,
    banner: TextureHandle,
}

struct AlbumTextures {
    source: Arc<VisualAssets>,
    thumbnail: TextureHandle,
    overlay: TextureHandle,
}

struct StartupAssets {
    icons: IconImages,
    disc: ColorImage,
}

fn sprite(texture: &TextureHandle) -> Sprite {
    Sprite {
        id: texture.id(),
        size: texture.size_vec2(),
    }
}

struct SpinnerApp {
    config: Config,
    turntable: Turntable,
    cache: Arc<MetadataCache>,
    refresh: RefreshCoordinator,
    transport: TransportWorker,
    scratch: ScratchDeck,
    icons: IconTextures,
    disc: TextureHandle,
    album: Option<AlbumTextures>,
    shown_generation: Option<u64>,
    last_frame: Option<Instant>,
}

impl SpinnerApp {
    fn new(
        ctx: &egui::Context,
        config: Config,
        startup: StartupAssets,
        cache: Arc<MetadataCache>,
        refresh: RefreshCoordinator,
        transport: TransportWorker,
    ) -> Self {
        let load = |name: &str, image: ColorImage| ctx.load_texture(name, image, TextureOptions::LINEAR);
        let StartupAssets { icons, disc } = startup;
        let icons = IconTextures {
            play: load("record_spinner.play", icons.play),
            pause: load("record_spinner.pause", icons.pause),
            skip: load("record_spinner.skip", icons.skip),
            previous: load("record_spinner.previous", icons.previous),
            banner: load("record_spinner.banner", icons.banner),
        };
        let disc = load("record_spinner.disc", disc);

        let mut scratch = ScratchDeck::open(&config.assets.sfx_dir);
        if config.assets.watch_sfx {
            if let Err(err) = scratch.enable_hot_reload() {
                warn!("Not watching scratch sounds: {err:#}");
            }
        }

        let turntable = Turntable::new(
            RotationState::new(0.0, config.spin.angular_speed),
            SwipeThresholds {
                distance: config.gesture.swipe_distance,
                time: config.gesture.swipe_time,
            },
            config.spin.drag_sensitivity,
        );

        Self {
            config,
            turntable,
            cache,
            refresh,
            transport,
            scratch,
            icons,
            disc,
            album: None,
            shown_generation: None,
            last_frame: None,
        }
    }

    fn frame_textures(&self) -> FrameTextures {
        FrameTextures {
            disc: sprite(&self.disc),
            banner: sprite(&self.icons.banner),
            play: sprite(&self.icons.play),
            pause: sprite(&self.icons.pause),
            skip: sprite(&self.icons.skip),
            previous: sprite(&self.icons.previous),
        }
    }

    fn album_sprites(&self) -> Option<AlbumSprites> {
        self.album.as_ref().map(|album| AlbumSprites {
            thumbnail: sprite(&album.thumbnail),
            overlay: sprite(&album.overlay),
        })
    }

    /// Uploads textures for a newly published snapshot. Runs on the render
    /// thread; the snapshot itself is never modified.
    fn sync_album_textures(&mut self, ctx: &egui::Context, snapshot: Option<&MetadataSnapshot>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        if self.shown_generation == Some(snapshot.generation) {
            return;
        }
        self.shown_generation = Some(snapshot.generation);

        let Some(assets) = snapshot.assets.as_ref() else {
            self.album = None;
            return;
        };
        if let Some(current) = self.album.as_ref() {
            if Arc::ptr_eq(&current.source, assets) {
                return;
            }
        }

        self.album = Some(AlbumTextures {
            source: Arc::clone(assets),
            thumbnail: ctx.load_texture(
                "record_spinner.album.thumbnail",
                assets.thumbnail.clone(),
                TextureOptions::LINEAR,
            ),
            overlay: ctx.load_texture(
                "record_spinner.album.overlay",
                assets.overlay.clone(),
                TextureOptions::LINEAR,
            ),
        });
    }

    fn apply_transport_outcomes(&mut self, ctx: &egui::Context) {
        for outcome in self.transport.drain() {
            if !self.turntable.apply_outcome(&outcome) {
                continue;
            }
            if let Some(image) = outcome.new_disc {
                self.disc = ctx.load_texture("record_spinner.disc", image, TextureOptions::LINEAR);
            }
            self.refresh.request_refresh();
        }
    }

    fn react(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Scratch => self.scratch.play_random(),
            Reaction::Pressed(Control::Previous) => self.transport.send(TransportCommand::Previous),
            Reaction::Pressed(Control::Skip) => self.transport.send(TransportCommand::Next),
            Reaction::Pressed(Control::PlayPause) => {
                let command = if self.turntable.rotation().is_playing() {
                    TransportCommand::Pause
                } else {
                    TransportCommand::Resume
                };
                self.transport.send(command);
            }
        }
    }

    fn elapsed_frames(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|last| (now - last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        (dt * self.config.spin.frame_rate).min(MAX_FRAME_STEP)
    }
}

fn pointer_events(ctx: &egui::Context) -> Vec<PointerEvent> {
    let now = Instant::now();
    ctx.input(|input| {
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => Some(if *pressed {
                    PointerEvent::Down { pos: *pos, at: now }
                } else {
                    PointerEvent::Up { pos: *pos, at: now }
                }),
                egui::Event::PointerMoved(pos) => Some(PointerEvent::Move { pos: *pos }),
                _ => None,
            })
            .collect()
    })
}

impl eframe::App for SpinnerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(Key::Escape)) {
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }
        if self.config.window.hide_cursor {
            ctx.set_cursor_icon(CursorIcon::None);
        }

        self.scratch.poll_hot_reload();
        self.apply_transport_outcomes(ctx);

        let snapshot = self.cache.snapshot();
        self.sync_album_textures(ctx, snapshot.as_deref());

        let canvas = ctx.screen_rect();
        let textures = self.frame_textures();
        let album = self.album_sprites();
        let font_size = self.config.window.font_size;
        let line_height = ctx.fonts(|fonts| fonts.row_height(&FontId::proportional(font_size)));
        let layout = resolve_layout(&layout_input(
            canvas.size(),
            &textures,
            album.as_ref(),
            &self.config.layout,
            line_height,
        ));
        let disc_region = DiscRegion {
            center: canvas.center(),
            radius: canvas.width().min(canvas.height()) / 2.0,
        };

        for event in pointer_events(ctx) {
            for reaction in self.turntable.pointer(event, &disc_region, &layout) {
                self.react(reaction);
            }
        }

        let frames = self.elapsed_frames();
        self.turntable.tick(frames);

        let rotation = self.turntable.rotation();
        let commands = compose_frame(&FrameInputs {
            canvas,
            background: self.config.window.background,
            text_color: self.config.window.text_color,
            font_size,
            disc_size: canvas.width().min(canvas.height()) * self.config.disc.scale,
            angle: rotation.angle(),
            playing: rotation.is_playing(),
            textures: &textures,
            album: album.as_ref(),
            track: snapshot.as_ref().map(|s| &s.track),
            layout: &layout,
        });
        paint_frame(&ctx.layer_painter(LayerId::background()), &commands);

        ctx.request_repaint_after(Duration::from_secs_f32(1.0 / self.config.spin.frame_rate));
    }
}

impl Drop for SpinnerApp {
    fn drop(&mut self) {
        info!(
            "Closing after {} metadata refresh cycle(s), last one {:?}",
            self.refresh.completed_cycles(),
            self.refresh.phase()
        );
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    let icons = IconImages::load(&config.assets.icons_dir).context("Failed to load icons")?;
    let records = RecordLibrary::new(&config.assets.records_dir);
    let (disc_path, disc) = records.pick_random().context("Failed to load a record image")?;
    info!("Disc image: {}", disc_path.display());

    if config.spotify.access_token.is_none() {
        warn!(
            "No Spotify access token; set {} or spotify.access_token",
            config::TOKEN_ENV_VAR
        );
    }
    let service: Arc<dyn PlaybackService> =
        Arc::new(SpotifyClient::new(&config.spotify, config.refresh.http_timeout)?);

    let cache = Arc::new(MetadataCache::new());
    let refresh = RefreshCoordinator::spawn(
        Arc::clone(&service),
        Arc::clone(&cache),
        OverlayOptions::from_config(&config.disc),
        config.refresh.interval,
    )
    .context("Failed to start metadata refresh worker")?;

    let transport = TransportWorker::spawn(
        service,
        Box::new(move || {
            let (path, image) = records.pick_random()?;
            info!("Disc image: {}", path.display());
            Ok(image)
        }),
    )
    .context("Failed to start transport worker")?;

    let fullscreen = !cli.windowed;
    info!(
        "Starting {}",
        if fullscreen { "full screen" } else { "windowed" }
    );
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(config.window.title.clone())
            .with_inner_size([config.window.width, config.window.height])
            .with_fullscreen(fullscreen),
        ..Default::default()
    };

    let title = config.window.title.clone();
    let startup = StartupAssets { icons, disc };
    eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(SpinnerApp::new(
                &cc.egui_ctx,
                config,
                startup,
                cache,
                refresh,
                transport,
            )))
        }),
    )
    .map_err(|e| anyhow!("Window system error: {e}"))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
