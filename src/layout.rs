use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Previous,
    PlayPause,
    Skip,
}

impl Control {
    pub const ALL: [Control; 3] = [Control::Previous, Control::PlayPause, Control::Skip];
}

/// Everything the transport row depends on. Sizes come straight from the
/// loaded textures, so a new thumbnail changes the input and hence the layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput {
    pub canvas: Vec2,
    pub banner: Vec2,
    pub banner_top: f32,
    pub thumbnail: Option<Vec2>,
    pub previous: Vec2,
    pub play_pause: Vec2,
    pub skip: Vec2,
    pub gap: f32,
    pub text_gap: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRects {
    pub banner: Rect,
    pub thumbnail: Option<Rect>,
    pub previous: Rect,
    pub play_pause: Rect,
    pub skip: Rect,
    /// Center-bottom anchor of the title line.
    pub title_anchor: Pos2,
    /// Center-bottom anchor of the artist line, directly below the title.
    pub artist_anchor: Pos2,
}

impl LayoutRects {
    pub fn control_rect(&self, control: Control) -> Rect {
        match control {
            Control::Previous => self.previous,
            Control::PlayPause => self.play_pause,
            Control::Skip => self.skip,
        }
    }

    pub fn control_at(&self, pos: Pos2) -> Option<Control> {
        Control::ALL
            .into_iter()
            .find(|control| self.control_rect(*control).contains(pos))
    }
}

/// Lays out thumbnail, previous, play/pause and skip left to right as one
/// group centered horizontally on the canvas and vertically on the banner
/// strip, with the title and artist stacked above the play/pause control.
pub fn resolve_layout(input: &LayoutInput) -> LayoutRects {
    let banner_min = pos2((input.canvas.x - input.banner.x) / 2.0, input.banner_top);
    let banner = Rect::from_min_size(banner_min, input.banner);
    let row_center_y = banner.center().y;

    let mut sizes: Vec<Vec2> = Vec::with_capacity(4);
    if let Some(thumb) = input.thumbnail {
        sizes.push(thumb);
    }
    sizes.extend([input.previous, input.play_pause, input.skip]);

    let gaps = input.gap * (sizes.len().saturating_sub(1)) as f32;
    let row_width: f32 = sizes.iter().map(|s| s.x).sum::<f32>() + gaps;

    let mut x = (input.canvas.x - row_width) / 2.0;
    let mut rects = Vec::with_capacity(sizes.len());
    for size in sizes {
        rects.push(Rect::from_min_size(pos2(x, row_center_y - size.y / 2.0), size));
        x += size.x + input.gap;
    }

    let skip = rects.pop().unwrap_or(Rect::NOTHING);
    let play_pause = rects.pop().unwrap_or(Rect::NOTHING);
    let previous = rects.pop().unwrap_or(Rect::NOTHING);
    let thumbnail = rects.pop();

    let row_top = [Some(previous), Some(play_pause), Some(skip), thumbnail]
        .into_iter()
        .flatten()
        .map(|r| r.min.y)
        .fold(f32::INFINITY, f32::min);

    let artist_anchor = pos2(play_pause.center().x, row_top - input.text_gap);
    let title_anchor = artist_anchor - vec2(0.0, input.line_height);

    LayoutRects {
        banner,
        thumbnail,
        previous,
        play_pause,
        skip,
        title_anchor,
        artist_anchor,
    }
}
