//! Derived bed state for controllers without position telemetry.
//!
//! Some controllers accept movement commands but never report where the
//! actuators are. For those, the bridge keeps its own estimate by replaying
//! command history: each successfully transmitted step command moves an
//! axis by a fixed fraction of full travel, and toggle commands flip a
//! switch.
//!
//! # Drift
//!
//! The estimate is never reconciled with the hardware. A press from the
//! physical remote, a command the controller ignored, or a move that hit an
//! end stop early all make it diverge from the real position, and it starts
//! from zero on every restart. Treat it as a hint for dashboards, not as
//! ground truth.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::{BedModel, DerivedStateTracker, StateField};
//!
//! let profile = BedModel::Linak.descriptor().motion.unwrap();
//! let mut tracker = DerivedStateTracker::new(profile);
//!
//! let delta = tracker.apply("Light");
//! assert_eq!(delta.fields(), &[StateField::Light(true)]);
//!
//! // Already at the floor, nothing changes
//! assert!(tracker.apply("Head Down").is_empty());
//! ```

use crate::codec::normalize_name;

/// Upper bound of an axis position, in percent.
pub const FULL_TRAVEL: f32 = 100.0;

/// A motorized axis of the bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Head/back section.
    Head,
    /// Foot/leg section.
    Foot,
}

/// An on/off feature of the bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Switch {
    /// Under-bed light.
    Light,
}

/// What a successful command does to the estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Move the axis up by one step.
    Raise(Axis),
    /// Move the axis down by one step.
    Lower(Axis),
    /// Flip the switch.
    Toggle(Switch),
}

/// Step sizes and per-command effects for one model.
#[derive(Debug)]
pub struct MotionProfile {
    /// Number of presses needed to move the head from 0 to 100%.
    pub head_steps: u32,
    /// Number of presses needed to move the foot from 0 to 100%.
    pub foot_steps: u32,
    /// `(command name, effects)` pairs.
    pub effects: &'static [(&'static str, &'static [Effect])],
}

impl MotionProfile {
    /// Presses needed for full travel of the axis (at least 1).
    pub fn steps(&self, axis: Axis) -> u32 {
        let steps = match axis {
            Axis::Head => self.head_steps,
            Axis::Foot => self.foot_steps,
        };
        steps.max(1)
    }

    /// Percentage moved by a single press on the axis.
    pub fn step(&self, axis: Axis) -> f32 {
        FULL_TRAVEL / self.steps(axis) as f32
    }

    /// Effects of a command, empty if the command does not move anything.
    pub fn effects_for(&self, name: &str) -> &'static [Effect] {
        let key = normalize_name(name);
        self.effects
            .iter()
            .find(|(candidate, _)| normalize_name(candidate) == key)
            .map(|(_, effects)| *effects)
            .unwrap_or(&[])
    }
}

/// Estimated bed state.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BedState {
    /// Head position, 0.0 to 100.0.
    pub head: f32,
    /// Foot position, 0.0 to 100.0.
    pub foot: f32,
    /// Light on/off.
    pub light: bool,
}

impl BedState {
    /// Position of an axis.
    pub fn position(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Head => self.head,
            Axis::Foot => self.foot,
        }
    }

    /// Compact JSON snapshot, e.g. `{"head":12,"foot":0,"light":"OFF"}`.
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"head":{},"foot":{},"light":"{}"}}"#,
            StateField::Head(self.head).value(),
            StateField::Foot(self.foot).value(),
            StateField::Light(self.light).value(),
        )
    }
}

/// One changed field of [`BedState`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateField {
    /// New head position.
    Head(f32),
    /// New foot position.
    Foot(f32),
    /// New light state.
    Light(bool),
}

impl StateField {
    /// Field name, used as the last topic segment when republishing.
    pub const fn name(&self) -> &'static str {
        match self {
            StateField::Head(_) => "head",
            StateField::Foot(_) => "foot",
            StateField::Light(_) => "light",
        }
    }

    /// Field value as published: whole percent for axes, `ON`/`OFF` for
    /// switches.
    pub fn value(&self) -> String {
        match self {
            StateField::Head(v) | StateField::Foot(v) => format!("{}", v.round() as u8),
            StateField::Light(true) => "ON".to_string(),
            StateField::Light(false) => "OFF".to_string(),
        }
    }
}

/// Fields changed by one command, in effect order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StateDelta {
    fields: Vec<StateField>,
}

impl StateDelta {
    /// An empty delta.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Changed fields.
    pub fn fields(&self) -> &[StateField] {
        &self.fields
    }

    /// Iterate over changed fields.
    pub fn iter(&self) -> impl Iterator<Item = &StateField> {
        self.fields.iter()
    }

    fn push(&mut self, field: StateField) {
        // A command touching the same field twice reports the final value once.
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name() == field.name()) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
    }
}

/// Projects command history onto an estimated [`BedState`].
///
/// See the module docs for why this estimate drifts.
///
/// Positions are kept as press counts, so `steps` presses always land on
/// exactly 100%.
#[derive(Debug)]
pub struct DerivedStateTracker {
    profile: &'static MotionProfile,
    head: u32,
    foot: u32,
    light: bool,
}

impl DerivedStateTracker {
    /// Start tracking from the all-down, light-off state.
    pub fn new(profile: &'static MotionProfile) -> Self {
        Self {
            profile,
            head: 0,
            foot: 0,
            light: false,
        }
    }

    /// Current estimate.
    pub fn state(&self) -> BedState {
        BedState {
            head: self.percent(Axis::Head),
            foot: self.percent(Axis::Foot),
            light: self.light,
        }
    }

    /// Record a successfully transmitted command and return what changed.
    ///
    /// Positions saturate at 0 and 100%; a field is only reported when its
    /// value actually moved.
    pub fn apply(&mut self, command: &str) -> StateDelta {
        let mut delta = StateDelta::empty();

        for effect in self.profile.effects_for(command) {
            match *effect {
                Effect::Raise(axis) => self.step(axis, true, &mut delta),
                Effect::Lower(axis) => self.step(axis, false, &mut delta),
                Effect::Toggle(Switch::Light) => {
                    self.light = !self.light;
                    delta.push(StateField::Light(self.light));
                }
            }
        }

        delta
    }

    fn step(&mut self, axis: Axis, up: bool, delta: &mut StateDelta) {
        let full = self.profile.steps(axis);
        let count = match axis {
            Axis::Head => &mut self.head,
            Axis::Foot => &mut self.foot,
        };
        let previous = *count;
        *count = if up {
            (previous + 1).min(full)
        } else {
            previous.saturating_sub(1)
        };

        if *count != previous {
            let percent = self.percent(axis);
            delta.push(match axis {
                Axis::Head => StateField::Head(percent),
                Axis::Foot => StateField::Foot(percent),
            });
        }
    }

    fn percent(&self, axis: Axis) -> f32 {
        let count = match axis {
            Axis::Head => self.head,
            Axis::Foot => self.foot,
        };
        count as f32 * FULL_TRAVEL / self.profile.steps(axis) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: MotionProfile = MotionProfile {
        head_steps: 85,
        foot_steps: 60,
        effects: &[
            ("Head Up", &[Effect::Raise(Axis::Head)]),
            ("Head Down", &[Effect::Lower(Axis::Head)]),
            ("Both Up", &[Effect::Raise(Axis::Head), Effect::Raise(Axis::Foot)]),
            ("Light", &[Effect::Toggle(Switch::Light)]),
        ],
    };

    static TEST_PROFILE: MotionProfile = PROFILE;

    #[test]
    fn step_sizes() {
        assert!((TEST_PROFILE.step(Axis::Head) - 100.0 / 85.0).abs() < 1e-6);
        assert!((TEST_PROFILE.step(Axis::Foot) - 100.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn starts_zeroed() {
        let tracker = DerivedStateTracker::new(&TEST_PROFILE);
        assert_eq!(tracker.state(), BedState::default());
    }

    #[test]
    fn raise_reports_new_position() {
        let mut tracker = DerivedStateTracker::new(&TEST_PROFILE);
        let delta = tracker.apply("head_up");
        assert_eq!(delta.len(), 1);
        match delta.fields()[0] {
            StateField::Head(v) => assert!((v - 100.0 / 85.0).abs() < 1e-5),
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[test]
    fn lower_at_floor_is_silent() {
        let mut tracker = DerivedStateTracker::new(&TEST_PROFILE);
        assert!(tracker.apply("Head Down").is_empty());
        assert_eq!(tracker.state().head, 0.0);
    }

    #[test]
    fn both_up_moves_both_axes() {
        let mut tracker = DerivedStateTracker::new(&TEST_PROFILE);
        let delta = tracker.apply("Both Up");
        let names: Vec<_> = delta.iter().map(StateField::name).collect();
        assert_eq!(names, ["head", "foot"]);
    }

    #[test]
    fn light_toggles() {
        let mut tracker = DerivedStateTracker::new(&TEST_PROFILE);
        assert_eq!(tracker.apply("Light").fields(), &[StateField::Light(true)]);
        assert_eq!(tracker.apply("light").fields(), &[StateField::Light(false)]);
    }

    #[test]
    fn unknown_command_has_no_effect() {
        let mut tracker = DerivedStateTracker::new(&TEST_PROFILE);
        assert!(tracker.apply("Flat Preset").is_empty());
    }

    #[test]
    fn field_values() {
        assert_eq!(StateField::Head(41.2).value(), "41");
        assert_eq!(StateField::Foot(100.0).value(), "100");
        assert_eq!(StateField::Light(true).value(), "ON");
        assert_eq!(StateField::Light(false).value(), "OFF");
    }

    #[test]
    fn state_json() {
        let state = BedState {
            head: 50.0,
            foot: 1.6,
            light: true,
        };
        assert_eq!(state.to_json(), r#"{"head":50,"foot":2,"light":"ON"}"#);
    }
}
