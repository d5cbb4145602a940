use eframe::egui::{
    self, epaint::Vertex, pos2, vec2, Align2, Color32, CornerRadius, FontId, Mesh, Painter, Pos2,
    Rect, Shape, TextureId, Vec2,
};

use crate::{
    config::LayoutConfig,
    layout::{LayoutInput, LayoutRects},
    metadata::TrackInfo,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub id: TextureId,
    pub size: Vec2,
}

/// Textures that exist for the whole session.
#[derive(Debug, Clone, Copy)]
pub struct FrameTextures {
    pub disc: Sprite,
    pub banner: Sprite,
    pub play: Sprite,
    pub pause: Sprite,
    pub skip: Sprite,
    pub previous: Sprite,
}

/// Textures built from the current album cover.
#[derive(Debug, Clone, Copy)]
pub struct AlbumSprites {
    pub thumbnail: Sprite,
    pub overlay: Sprite,
}

/// Builds the layout input from the sizes of what will actually be drawn.
/// Hit-testing and drawing both go through here.
pub fn layout_input(
    canvas: Vec2,
    textures: &FrameTextures,
    album: Option<&AlbumSprites>,
    config: &LayoutConfig,
    line_height: f32,
) -> LayoutInput {
    LayoutInput {
        canvas,
        banner: textures.banner.size,
        banner_top: config.banner_top,
        thumbnail: album.map(|a| a.thumbnail.size),
        previous: textures.previous.size,
        // keeps the button box stable when the icon flips
        play_pause: textures.play.size.max(textures.pause.size),
        skip: textures.skip.size,
        gap: config.gap,
        text_gap: config.text_gap,
        line_height,
    }
}

pub struct FrameInputs<'a> {
    pub canvas: Rect,
    pub background: Color32,
    pub text_color: Color32,
    pub font_size: f32,
    pub disc_size: f32,
    pub angle: f32,
    pub playing: bool,
    pub textures: &'a FrameTextures,
    pub album: Option<&'a AlbumSprites>,
    pub track: Option<&'a TrackInfo>,
    pub layout: &'a LayoutRects,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        rect: Rect,
        color: Color32,
    },
    RotatedImage {
        texture: TextureId,
        center: Pos2,
        size: Vec2,
        angle_degrees: f32,
    },
    Image {
        texture: TextureId,
        rect: Rect,
    },
    Text {
        text: String,
        anchor: Pos2,
        color: Color32,
        size: f32,
    },
}

/// Lists what to draw this frame, back to front.
pub fn compose_frame(inputs: &FrameInputs<'_>) -> Vec<DrawCommand> {
    let center = inputs.canvas.center();
    let textures = inputs.textures;
    let layout = inputs.layout;
    let mut commands = Vec::with_capacity(12);

    commands.push(DrawCommand::Fill {
        rect: inputs.canvas,
        color: inputs.background,
    });

    commands.push(DrawCommand::RotatedImage {
        texture: textures.disc.id,
        center,
        size: vec2(inputs.disc_size, inputs.disc_size),
        angle_degrees: inputs.angle,
    });

    if let Some(album) = inputs.album {
        commands.push(DrawCommand::RotatedImage {
            texture: album.overlay.id,
            center,
            size: album.overlay.size,
            angle_degrees: inputs.angle,
        });
    }

    commands.push(DrawCommand::Image {
        texture: textures.banner.id,
        rect: layout.banner,
    });

    if let (Some(album), Some(rect)) = (inputs.album, layout.thumbnail) {
        commands.push(DrawCommand::Image {
            texture: album.thumbnail.id,
            rect,
        });
    }

    let play_pause = if inputs.playing {
        textures.pause
    } else {
        textures.play
    };
    for (sprite, slot) in [
        (textures.previous, layout.previous),
        (play_pause, layout.play_pause),
        (textures.skip, layout.skip),
    ] {
        commands.push(DrawCommand::Image {
            texture: sprite.id,
            rect: Rect::from_center_size(slot.center(), sprite.size),
        });
    }

    if let Some(track) = inputs.track {
        commands.push(DrawCommand::Text {
            text: track.title.clone(),
            anchor: layout.title_anchor,
            color: inputs.text_color,
            size: inputs.font_size,
        });
        commands.push(DrawCommand::Text {
            text: track.artist.clone(),
            anchor: layout.artist_anchor,
            color: inputs.text_color,
            size: inputs.font_size,
        });
    }

    commands
}

pub fn paint_frame(painter: &Painter, commands: &[DrawCommand]) {
    let full_uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
    for command in commands {
        match command {
            DrawCommand::Fill { rect, color } => {
                painter.rect_filled(*rect, CornerRadius::ZERO, *color);
            }
            DrawCommand::RotatedImage {
                texture,
                center,
                size,
                angle_degrees,
            } => {
                painter.add(rotated_quad(*texture, *center, *size, *angle_degrees));
            }
            DrawCommand::Image { texture, rect } => {
                painter.image(*texture, *rect, full_uv, Color32::WHITE);
            }
            DrawCommand::Text {
                text,
                anchor,
                color,
                size,
            } => {
                painter.text(
                    *anchor,
                    Align2::CENTER_BOTTOM,
                    text,
                    FontId::proportional(*size),
                    *color,
                );
            }
        }
    }
}

/// Textured square turned counter-clockwise by `angle_degrees` on screen.
fn rotated_quad(texture: TextureId, center: Pos2, size: Vec2, angle_degrees: f32) -> Shape {
    let half = size * 0.5;
    // screen y points down, so a positive screen rotation turns clockwise
    let radians = -angle_degrees.to_radians();
    let (sin_r, cos_r) = radians.sin_cos();

    let offsets = [
        vec2(-half.x, -half.y),
        vec2(half.x, -half.y),
        vec2(half.x, half.y),
        vec2(-half.x, half.y),
    ];
    let uvs = [
        pos2(0.0, 0.0),
        pos2(1.0, 0.0),
        pos2(1.0, 1.0),
        pos2(0.0, 1.0),
    ];

    let mut mesh = Mesh::with_texture(texture);
    for (offset, uv) in offsets.into_iter().zip(uvs) {
        let rotated = vec2(
            offset.x * cos_r - offset.y * sin_r,
            offset.x * sin_r + offset.y * cos_r,
        );
        mesh.vertices.push(Vertex {
            pos: center + rotated,
            uv,
            color: Color32::WHITE,
        });
    }
    mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
    egui::Shape::mesh(mesh)
}
