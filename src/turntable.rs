use log::{debug, warn};

use crate::{
    gesture::{DiscRegion, GestureDetector, GestureIntent, PointerEvent, SwipeThresholds},
    layout::{Control, LayoutRects},
    rotation::RotationState,
    transport::{TransportCommand, TransportOutcome},
};

/// What the rest of the app has to do in response to pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Scratch,
    Pressed(Control),
}

/// Render-loop-owned interaction state: disc rotation plus the gesture in flight.
#[derive(Debug, Clone)]
pub struct Turntable {
    rotation: RotationState,
    gestures: GestureDetector,
    drag_sensitivity: f32,
}

impl Turntable {
    pub fn new(rotation: RotationState, thresholds: SwipeThresholds, drag_sensitivity: f32) -> Self {
        Self {
            rotation,
            gestures: GestureDetector::new(thresholds),
            drag_sensitivity,
        }
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub fn pointer(
        &mut self,
        event: PointerEvent,
        disc: &DiscRegion,
        rects: &LayoutRects,
    ) -> Vec<Reaction> {
        let mut reactions = Vec::new();
        for intent in self.gestures.handle(event, disc, rects) {
            debug!("gesture intent {intent:?}");
            match intent {
                GestureIntent::StartDrag => self.rotation.begin_drag(),
                GestureIntent::DragBy(dx) => self.rotation.drag_by(dx, self.drag_sensitivity),
                GestureIntent::EndDrag => self.rotation.end_drag(),
                GestureIntent::Swipe => reactions.push(Reaction::Scratch),
                GestureIntent::Tap(control) => reactions.push(Reaction::Pressed(control)),
            }
        }
        reactions
    }

    /// Applies a finished playback command. Play state only follows commands
    /// the service accepted. Returns whether the metadata should be refreshed.
    pub fn apply_outcome(&mut self, outcome: &TransportOutcome) -> bool {
        if let Err(err) = &outcome.result {
            warn!("{} failed: {err}", outcome.command.label());
            return false;
        }

        match outcome.command {
            TransportCommand::Pause => self.rotation.set_playing(false),
            TransportCommand::Resume => self.rotation.set_playing(true),
            TransportCommand::Next | TransportCommand::Previous => {}
        }
        debug!(
            "{} confirmed; disc {:?} at {:.2} deg/frame",
            outcome.command.label(),
            self.rotation.mode(),
            self.rotation.angular_velocity()
        );
        true
    }

    pub fn tick(&mut self, dt_frames: f32) {
        self.rotation.advance(dt_frames);
    }
}
