/// Whether the disc turns by itself, follows the pointer, or sits still.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinMode {
    Spinning,
    Dragging,
    Stopped,
}

/// Disc orientation in degrees plus the passive spin rate in degrees per frame.
///
/// `angle` is kept inside `[0, 360)` after every mutation. While paused the
/// velocity is zero; a drag remembers whether the record was playing through
/// the velocity, so releasing it resumes the right mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationState {
    angle: f32,
    angular_velocity: f32,
    mode: SpinMode,
    spin_speed: f32,
}

impl RotationState {
    pub fn new(angle: f32, spin_speed: f32) -> Self {
        Self {
            angle: normalize_degrees(angle),
            angular_velocity: spin_speed,
            mode: SpinMode::Spinning,
            spin_speed,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn mode(&self) -> SpinMode {
        self.mode
    }

    /// True when playback is considered running, including while dragged.
    pub fn is_playing(&self) -> bool {
        self.angular_velocity != 0.0
    }

    /// Moves the disc forward by `dt_frames` nominal frames.
    pub fn advance(&mut self, dt_frames: f32) {
        if self.mode == SpinMode::Spinning && dt_frames > 0.0 {
            self.angle = normalize_degrees(self.angle + self.angular_velocity * dt_frames);
        }
    }

    /// Applies a horizontal pointer displacement. Rightward motion turns the
    /// disc the same way the passive spin does.
    pub fn drag_by(&mut self, dx: f32, sensitivity: f32) {
        if self.mode == SpinMode::Dragging {
            self.angle = normalize_degrees(self.angle - dx * sensitivity);
        }
    }

    pub fn begin_drag(&mut self) {
        self.mode = SpinMode::Dragging;
    }

    pub fn end_drag(&mut self) {
        if self.mode == SpinMode::Dragging {
            self.mode = self.resting_mode();
        }
    }

    /// Switches between spinning and stopped without touching the angle.
    pub fn set_playing(&mut self, playing: bool) {
        self.angular_velocity = if playing { self.spin_speed } else { 0.0 };
        if self.mode != SpinMode::Dragging {
            self.mode = self.resting_mode();
        }
    }

    fn resting_mode(&self) -> SpinMode {
        if self.is_playing() {
            SpinMode::Spinning
        } else {
            SpinMode::Stopped
        }
    }
}

pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
