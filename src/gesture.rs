use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Vec2};

use crate::layout::{Control, LayoutRects};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pos: Pos2, at: Instant },
    Move { pos: Pos2 },
    Up { pos: Pos2, at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIntent {
    StartDrag,
    DragBy(f32),
    EndDrag,
    Swipe,
    Tap(Control),
}

/// Circular grab area of the disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscRegion {
    pub center: Pos2,
    pub radius: f32,
}

impl DiscRegion {
    pub fn contains(&self, pos: Pos2) -> bool {
        self.center.distance(pos) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    pub distance: f32,
    pub time: Duration,
}

impl SwipeThresholds {
    /// Both bounds are strict: a release exactly at the distance or exactly
    /// at the time limit is not a swipe.
    pub fn is_swipe(&self, displacement: Vec2, elapsed: Duration) -> bool {
        displacement.length() > self.distance && elapsed < self.time
    }
}

/// One in-flight gesture; empty between pointer-up and the next pointer-down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub pointer_down_at: Option<(Pos2, Instant)>,
    pub is_dragging: bool,
    pub last_pointer_position: Option<Pos2>,
}

#[derive(Debug, Clone)]
pub struct GestureDetector {
    thresholds: SwipeThresholds,
    state: GestureState,
}

impl GestureDetector {
    pub fn new(thresholds: SwipeThresholds) -> Self {
        Self {
            thresholds,
            state: GestureState::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        disc: &DiscRegion,
        rects: &LayoutRects,
    ) -> Vec<GestureIntent> {
        match event {
            PointerEvent::Down { pos, at } => self.on_down(pos, at, disc, rects),
            PointerEvent::Move { pos } => self.on_move(pos),
            PointerEvent::Up { pos, at } => self.on_up(pos, at),
        }
    }

    fn on_down(
        &mut self,
        pos: Pos2,
        at: Instant,
        disc: &DiscRegion,
        rects: &LayoutRects,
    ) -> Vec<GestureIntent> {
        self.state = GestureState {
            pointer_down_at: Some((pos, at)),
            is_dragging: false,
            last_pointer_position: Some(pos),
        };

        // buttons sit above the disc, so they win the hit test
        if let Some(control) = rects.control_at(pos) {
            return vec![GestureIntent::Tap(control)];
        }

        if disc.contains(pos) {
            self.state.is_dragging = true;
            return vec![GestureIntent::StartDrag];
        }

        Vec::new()
    }

    fn on_move(&mut self, pos: Pos2) -> Vec<GestureIntent> {
        if !self.state.is_dragging {
            return Vec::new();
        }
        let Some(last) = self.state.last_pointer_position.replace(pos) else {
            return Vec::new();
        };
        let dx = pos.x - last.x;
        if dx == 0.0 {
            return Vec::new();
        }
        vec![GestureIntent::DragBy(dx)]
    }

    fn on_up(&mut self, pos: Pos2, at: Instant) -> Vec<GestureIntent> {
        let mut intents = Vec::with_capacity(2);
        if let Some((down_pos, down_at)) = self.state.pointer_down_at {
            let elapsed = at.saturating_duration_since(down_at);
            if self.thresholds.is_swipe(pos - down_pos, elapsed) {
                intents.push(GestureIntent::Swipe);
            }
        }
        intents.push(GestureIntent::EndDrag);
        self.state = GestureState::default();
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{resolve_layout, LayoutInput};
    use eframe::egui::{pos2, vec2};

    fn rects() -> LayoutRects {
        resolve_layout(&LayoutInput {
            canvas: vec2(1080.0, 1080.0),
            banner: vec2(1000.0, 200.0),
            banner_top: 800.0,
            thumbnail: None,
            previous: vec2(80.0, 80.0),
            play_pause: vec2(100.0, 100.0),
            skip: vec2(80.0, 80.0),
            gap: 20.0,
            text_gap: 8.0,
            line_height: 30.0,
        })
    }

    fn disc() -> DiscRegion {
        DiscRegion {
            center: pos2(540.0, 540.0),
            radius: 540.0,
        }
    }

    fn detector() -> GestureDetector {
        GestureDetector::new(SwipeThresholds {
            distance: 100.0,
            time: Duration::from_millis(500),
        })
    }

    #[test]
    fn down_on_disc_starts_drag() {
        let mut d = detector();
        let intents = d.handle(
            PointerEvent::Down {
                pos: pos2(600.0, 500.0),
                at: Instant::now(),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(intents, vec![GestureIntent::StartDrag]);
        assert!(d.state().is_dragging);
    }

    #[test]
    fn down_on_control_inside_disc_taps_instead_of_dragging() {
        let mut d = detector();
        let pos = pos2(540.0, 900.0);
        assert!(disc().contains(pos));
        let intents = d.handle(
            PointerEvent::Down {
                pos,
                at: Instant::now(),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(
            intents,
            vec![GestureIntent::Tap(Control::PlayPause)]
        );
        assert!(!d.state().is_dragging);
        let moved = d.handle(PointerEvent::Move { pos: pos2(600.0, 900.0) }, &disc(), &rects());
        assert!(moved.is_empty());
    }

    #[test]
    fn down_outside_disc_and_controls_does_nothing() {
        let mut d = detector();
        let intents = d.handle(
            PointerEvent::Down {
                pos: pos2(5.0, 5.0),
                at: Instant::now(),
            },
            &disc(),
            &rects(),
        );
        assert!(intents.is_empty());
        assert!(d.state().pointer_down_at.is_some());
    }

    #[test]
    fn move_reports_horizontal_delta_since_last_position() {
        let mut d = detector();
        d.handle(
            PointerEvent::Down {
                pos: pos2(500.0, 400.0),
                at: Instant::now(),
            },
            &disc(),
            &rects(),
        );
        let first = d.handle(PointerEvent::Move { pos: pos2(530.0, 420.0) }, &disc(), &rects());
        let second = d.handle(PointerEvent::Move { pos: pos2(520.0, 300.0) }, &disc(), &rects());
        assert_eq!(first, vec![GestureIntent::DragBy(30.0)]);
        assert_eq!(second, vec![GestureIntent::DragBy(-10.0)]);
    }

    #[test]
    fn up_always_ends_drag_and_clears_state() {
        let mut d = detector();
        let t0 = Instant::now();
        d.handle(
            PointerEvent::Down {
                pos: pos2(500.0, 400.0),
                at: t0,
            },
            &disc(),
            &rects(),
        );
        let intents = d.handle(
            PointerEvent::Up {
                pos: pos2(510.0, 400.0),
                at: t0 + Duration::from_secs(2),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(intents, vec![GestureIntent::EndDrag]);
        assert_eq!(*d.state(), GestureState::default());
    }

    #[test]
    fn swipe_thresholds_are_strict() {
        let t = SwipeThresholds {
            distance: 100.0,
            time: Duration::from_millis(500),
        };
        assert!(t.is_swipe(vec2(100.5, 0.0), Duration::from_millis(100)));
        assert!(!t.is_swipe(vec2(100.0, 0.0), Duration::from_millis(100)));
        assert!(!t.is_swipe(vec2(60.0, 80.0), Duration::from_millis(100)));
        assert!(!t.is_swipe(vec2(300.0, 0.0), Duration::from_millis(500)));
        assert!(t.is_swipe(vec2(300.0, 0.0), Duration::from_millis(499)));
    }

    #[test]
    fn swipe_is_judged_on_endpoints_only() {
        let mut d = detector();
        let t0 = Instant::now();
        d.handle(
            PointerEvent::Down {
                pos: pos2(300.0, 300.0),
                at: t0,
            },
            &disc(),
            &rects(),
        );
        // wander far away and come back close to the start
        d.handle(PointerEvent::Move { pos: pos2(700.0, 300.0) }, &disc(), &rects());
        let intents = d.handle(
            PointerEvent::Up {
                pos: pos2(350.0, 300.0),
                at: t0 + Duration::from_millis(100),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(intents, vec![GestureIntent::EndDrag]);
    }

    #[test]
    fn swipe_starting_on_a_control_still_counts() {
        let mut d = detector();
        let t0 = Instant::now();
        d.handle(
            PointerEvent::Down {
                pos: pos2(540.0, 900.0),
                at: t0,
            },
            &disc(),
            &rects(),
        );
        let intents = d.handle(
            PointerEvent::Up {
                pos: pos2(540.0, 700.0),
                at: t0 + Duration::from_millis(200),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(intents, vec![GestureIntent::Swipe, GestureIntent::EndDrag]);
    }

    #[test]
    fn up_without_down_only_ends_drag() {
        let mut d = detector();
        let intents = d.handle(
            PointerEvent::Up {
                pos: pos2(0.0, 0.0),
                at: Instant::now(),
            },
            &disc(),
            &rects(),
        );
        assert_eq!(intents, vec![GestureIntent::EndDrag]);
    }
}
