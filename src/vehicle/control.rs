use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FdmError, Result};

// ---------------------------------------------------------------------------
// Control outputs
// ---------------------------------------------------------------------------

/// Every control effect the airframe understands. Parsed once from its
/// upper-case name; the per-step path only sees the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    #[serde(rename = "THROTTLE")]
    Throttle,
    #[serde(rename = "MIXTURE")]
    Mixture,
    #[serde(rename = "CONDLEVER")]
    CondLever,
    #[serde(rename = "STARTER")]
    Starter,
    #[serde(rename = "MAGNETOS")]
    Magnetos,
    #[serde(rename = "ADVANCE")]
    Advance,
    #[serde(rename = "PROPPITCH")]
    PropPitch,
    #[serde(rename = "BOOST")]
    Boost,
    #[serde(rename = "BRAKE")]
    Brake,
    #[serde(rename = "STEER")]
    Steer,
    #[serde(rename = "EXTEND")]
    Extend,
    #[serde(rename = "CASTERING")]
    Castering,
    #[serde(rename = "HEXTEND")]
    HookExtend,
    #[serde(rename = "LEXTEND")]
    LaunchbarExtend,
    #[serde(rename = "LACCEL")]
    LaunchbarAccel,
    #[serde(rename = "INCIDENCE")]
    Incidence,
    #[serde(rename = "FLAP0")]
    Flap0,
    #[serde(rename = "FLAP1")]
    Flap1,
    #[serde(rename = "SLAT")]
    Slat,
    #[serde(rename = "SPOILER")]
    Spoiler,
    #[serde(rename = "FLAP0EFFECTIVENESS")]
    Flap0Effectiveness,
    #[serde(rename = "FLAP1EFFECTIVENESS")]
    Flap1Effectiveness,
}

/// The part family a control kind acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartFamily {
    Thruster,
    Wing,
    Gear,
    Hook,
    Launchbar,
}

const NAMES: [(&str, ControlKind); 22] = [
    ("THROTTLE", ControlKind::Throttle),
    ("MIXTURE", ControlKind::Mixture),
    ("CONDLEVER", ControlKind::CondLever),
    ("STARTER", ControlKind::Starter),
    ("MAGNETOS", ControlKind::Magnetos),
    ("ADVANCE", ControlKind::Advance),
    ("PROPPITCH", ControlKind::PropPitch),
    ("BOOST", ControlKind::Boost),
    ("BRAKE", ControlKind::Brake),
    ("STEER", ControlKind::Steer),
    ("EXTEND", ControlKind::Extend),
    ("CASTERING", ControlKind::Castering),
    ("HEXTEND", ControlKind::HookExtend),
    ("LEXTEND", ControlKind::LaunchbarExtend),
    ("LACCEL", ControlKind::LaunchbarAccel),
    ("INCIDENCE", ControlKind::Incidence),
    ("FLAP0", ControlKind::Flap0),
    ("FLAP1", ControlKind::Flap1),
    ("SLAT", ControlKind::Slat),
    ("SPOILER", ControlKind::Spoiler),
    ("FLAP0EFFECTIVENESS", ControlKind::Flap0Effectiveness),
    ("FLAP1EFFECTIVENESS", ControlKind::Flap1Effectiveness),
];

impl ControlKind {
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, k)| *k == self)
            .map_or("?", |(n, _)| n)
    }

    /// Output clamp range.
    pub fn range(self) -> (f64, f64) {
        use ControlKind::*;
        match self {
            Flap0 | Flap1 | Steer | Incidence => (-1.0, 1.0),
            Magnetos => (0.0, 3.0),
            Flap0Effectiveness | Flap1Effectiveness => (1.0, 10.0),
            _ => (0.0, 1.0),
        }
    }

    fn family(self) -> PartFamily {
        use ControlKind::*;
        match self {
            Throttle | Mixture | CondLever | Starter | Magnetos | Advance | PropPitch | Boost => PartFamily::Thruster,
            Brake | Steer | Extend | Castering => PartFamily::Gear,
            HookExtend => PartFamily::Hook,
            LaunchbarExtend | LaunchbarAccel => PartFamily::Launchbar,
            Incidence | Flap0 | Flap1 | Slat | Spoiler | Flap0Effectiveness | Flap1Effectiveness => PartFamily::Wing,
        }
    }
}

impl FromStr for ControlKind {
    type Err = FdmError;

    fn from_str(s: &str) -> Result<Self> {
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(s))
            .map(|(_, k)| *k)
            .ok_or_else(|| FdmError::UnknownControl(s.to_string()))
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The part a control output drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlTarget {
    Thruster(usize),
    Wing,
    Tail,
    Vstab(usize),
    Gear(usize),
    Hook(usize),
    Launchbar(usize),
}

impl ControlTarget {
    fn family(self) -> PartFamily {
        match self {
            ControlTarget::Thruster(_) => PartFamily::Thruster,
            ControlTarget::Wing | ControlTarget::Tail | ControlTarget::Vstab(_) => PartFamily::Wing,
            ControlTarget::Gear(_) => PartFamily::Gear,
            ControlTarget::Hook(_) => PartFamily::Hook,
            ControlTarget::Launchbar(_) => PartFamily::Launchbar,
        }
    }
}

impl fmt::Display for ControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlTarget::Thruster(i) => write!(f, "thruster {i}"),
            ControlTarget::Wing => f.write_str("wing"),
            ControlTarget::Tail => f.write_str("tail"),
            ControlTarget::Vstab(i) => write!(f, "vstab {i}"),
            ControlTarget::Gear(i) => write!(f, "gear {i}"),
            ControlTarget::Hook(i) => write!(f, "hook {i}"),
            ControlTarget::Launchbar(i) => write!(f, "launchbar {i}"),
        }
    }
}

/// Per-mapping shaping of an axis value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlOptions {
    /// Right side receives the negated value (ailerons).
    pub split: bool,
    pub invert: bool,
    /// v·|v|
    pub square: bool,
    /// Linear remap from `src` to `dst`.
    pub src: Option<[f64; 2]>,
    pub dst: Option<[f64; 2]>,
}

impl ControlOptions {
    pub fn split() -> Self {
        Self { split: true, ..Self::default() }
    }

    pub fn inverted() -> Self {
        Self { invert: true, ..Self::default() }
    }

    pub fn remap(src: [f64; 2], dst: [f64; 2]) -> Self {
        Self { src: Some(src), dst: Some(dst), ..Self::default() }
    }

    fn shape(&self, mut v: f64) -> f64 {
        if let (Some(src), Some(dst)) = (self.src, self.dst) {
            v = dst[0] + (v - src[0]) * (dst[1] - dst[0]) / (src[1] - src[0]);
        }
        if self.invert {
            v = -v;
        }
        if self.square {
            v *= v.abs();
        }
        v
    }
}

// ---------------------------------------------------------------------------
// Control map
// ---------------------------------------------------------------------------

/// Handle to a named input axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisId(usize);

/// Output value delivered to a part; `right` differs from `left` only for
/// split mappings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlSetting {
    pub kind: ControlKind,
    pub target: ControlTarget,
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone)]
struct Axis {
    name: String,
    value: f64,
}

#[derive(Debug, Clone)]
struct Output {
    kind: ControlKind,
    target: ControlTarget,
    inputs: Vec<(AxisId, ControlOptions)>,
    transition: f64, // s for a full-range sweep, 0 = instant
    left: f64,
    right: f64,
}

/// Routes normalized axis inputs to part outputs, summing several inputs
/// onto one output and rate-limiting outputs that have a transition time.
#[derive(Debug, Clone, Default)]
pub struct ControlMap {
    axes: Vec<Axis>,
    outputs: Vec<Output>,
}

impl ControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for axis `name`, registering it on first use.
    pub fn axis(&mut self, name: &str) -> AxisId {
        if let Some(i) = self.axes.iter().position(|a| a.name == name) {
            return AxisId(i);
        }
        self.axes.push(Axis { name: name.to_string(), value: 0.0 });
        AxisId(self.axes.len() - 1)
    }

    pub fn find_axis(&self, name: &str) -> Result<AxisId> {
        self.axes
            .iter()
            .position(|a| a.name == name)
            .map(AxisId)
            .ok_or_else(|| FdmError::UnknownAxis(name.to_string()))
    }

    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|a| a.name.as_str())
    }

    pub fn set_input(&mut self, axis: AxisId, value: f64) {
        if let Some(a) = self.axes.get_mut(axis.0) {
            a.value = value;
        }
    }

    pub fn input(&self, axis: AxisId) -> f64 {
        self.axes.get(axis.0).map_or(0.0, |a| a.value)
    }

    /// Zero every input axis.
    pub fn reset(&mut self) {
        for a in &mut self.axes {
            a.value = 0.0;
        }
    }

    fn output_mut(&mut self, kind: ControlKind, target: ControlTarget) -> Result<&mut Output> {
        if kind.family() != target.family() {
            return Err(FdmError::ControlTarget {
                kind: kind.to_string(),
                target: target.to_string(),
            });
        }
        let idx = match self.outputs.iter().position(|o| o.kind == kind && o.target == target) {
            Some(i) => i,
            None => {
                let (min, _) = kind.range();
                let rest = 0.0_f64.max(min);
                self.outputs.push(Output {
                    kind,
                    target,
                    inputs: Vec::new(),
                    transition: 0.0,
                    left: rest,
                    right: rest,
                });
                self.outputs.len() - 1
            }
        };
        Ok(&mut self.outputs[idx])
    }

    /// Feed `axis` into the `kind` output of `target`.
    pub fn add_mapping(&mut self, axis: AxisId, kind: ControlKind, target: ControlTarget, opts: ControlOptions) -> Result<()> {
        if axis.0 >= self.axes.len() {
            return Err(FdmError::UnknownAxis(format!("#{}", axis.0)));
        }
        if let Some(src) = opts.src {
            if src[0] == src[1] {
                return Err(FdmError::invalid("control.src", "source range is empty"));
            }
        }
        if opts.src.is_some() != opts.dst.is_some() {
            return Err(FdmError::invalid("control.dst", "src and dst must be given together"));
        }
        self.output_mut(kind, target)?.inputs.push((axis, opts));
        Ok(())
    }

    /// Time for the output to sweep its full range.
    pub fn set_transition_time(&mut self, kind: ControlKind, target: ControlTarget, secs: f64) -> Result<()> {
        if secs < 0.0 {
            return Err(FdmError::invalid("control.transition_time", "must not be negative"));
        }
        self.output_mut(kind, target)?.transition = secs;
        Ok(())
    }

    /// Recompute every output for a step of `dt` seconds.
    pub fn apply(&mut self, dt: f64) {
        let axes = &self.axes;
        for o in &mut self.outputs {
            let (mut left, mut right) = (0.0, 0.0);
            for (axis, opts) in &o.inputs {
                let v = opts.shape(axes[axis.0].value);
                left += v;
                right += if opts.split { -v } else { v };
            }
            let (min, max) = o.kind.range();
            if o.transition > 0.0 {
                let step = dt * (max - min) / o.transition;
                left = o.left + (left - o.left).clamp(-step, step);
                right = o.right + (right - o.right).clamp(-step, step);
            }
            o.left = left.clamp(min, max);
            o.right = right.clamp(min, max);
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = ControlTarget> + '_ {
        self.outputs.iter().map(|o| o.target)
    }

    pub fn settings(&self) -> impl Iterator<Item = ControlSetting> + '_ {
        self.outputs.iter().map(|o| ControlSetting {
            kind: o.kind,
            target: o.target,
            left: o.left,
            right: o.right,
        })
    }

    pub fn output(&self, kind: ControlKind, target: ControlTarget) -> Option<ControlSetting> {
        self.settings().find(|s| s.kind == kind && s.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kinds_parse_by_name() {
        assert_eq!("THROTTLE".parse::<ControlKind>().unwrap(), ControlKind::Throttle);
        assert_eq!("flap0".parse::<ControlKind>().unwrap(), ControlKind::Flap0);
        assert!(matches!("WARP".parse::<ControlKind>(), Err(FdmError::UnknownControl(_))));
        assert_eq!(ControlKind::HookExtend.to_string(), "HEXTEND");
    }

    #[test]
    fn serde_names_match_parse_names() {
        for (name, kind) in NAMES {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{name}\""));
        }
    }

    #[test]
    fn mismatched_target_is_rejected() {
        let mut cm = ControlMap::new();
        let a = cm.axis("throttle");
        let err = cm.add_mapping(a, ControlKind::Throttle, ControlTarget::Gear(0), ControlOptions::default());
        assert!(matches!(err, Err(FdmError::ControlTarget { .. })));
    }

    #[test]
    fn split_mapping_sums_with_plain_mapping() {
        let mut cm = ControlMap::new();
        let flaps = cm.axis("flaps");
        let ail = cm.axis("aileron");
        cm.add_mapping(flaps, ControlKind::Flap0, ControlTarget::Wing, ControlOptions::default()).unwrap();
        cm.add_mapping(ail, ControlKind::Flap0, ControlTarget::Wing, ControlOptions::split()).unwrap();
        cm.set_input(flaps, 0.5);
        cm.set_input(ail, 0.2);
        cm.apply(0.01);
        let s = cm.output(ControlKind::Flap0, ControlTarget::Wing).unwrap();
        assert_relative_eq!(s.left, 0.7);
        assert_relative_eq!(s.right, 0.3);
    }

    #[test]
    fn options_shape_the_input() {
        let mut cm = ControlMap::new();
        let a = cm.axis("elevator");
        let opts = ControlOptions { invert: true, square: true, ..ControlOptions::default() };
        cm.add_mapping(a, ControlKind::Flap0, ControlTarget::Tail, opts).unwrap();
        cm.set_input(a, 0.5);
        cm.apply(0.01);
        assert_relative_eq!(cm.output(ControlKind::Flap0, ControlTarget::Tail).unwrap().left, -0.25);

        let b = cm.axis("steering");
        cm.add_mapping(b, ControlKind::Steer, ControlTarget::Gear(0), ControlOptions::remap([-1.0, 1.0], [-0.5, 0.5]))
            .unwrap();
        cm.set_input(b, 1.0);
        cm.apply(0.01);
        assert_relative_eq!(cm.output(ControlKind::Steer, ControlTarget::Gear(0)).unwrap().left, 0.5);
    }

    #[test]
    fn outputs_clamp_to_range() {
        let mut cm = ControlMap::new();
        let a = cm.axis("throttle");
        cm.add_mapping(a, ControlKind::Throttle, ControlTarget::Thruster(0), ControlOptions::default()).unwrap();
        cm.set_input(a, 1.7);
        cm.apply(0.01);
        assert_relative_eq!(cm.output(ControlKind::Throttle, ControlTarget::Thruster(0)).unwrap().left, 1.0);
    }

    #[test]
    fn transition_time_limits_slew() {
        let mut cm = ControlMap::new();
        let a = cm.axis("gear");
        cm.add_mapping(a, ControlKind::Extend, ControlTarget::Gear(1), ControlOptions::default()).unwrap();
        cm.set_transition_time(ControlKind::Extend, ControlTarget::Gear(1), 5.0).unwrap();
        cm.set_input(a, 1.0);
        cm.apply(1.0);
        assert_relative_eq!(cm.output(ControlKind::Extend, ControlTarget::Gear(1)).unwrap().left, 0.2);
        cm.apply(100.0);
        assert_relative_eq!(cm.output(ControlKind::Extend, ControlTarget::Gear(1)).unwrap().left, 1.0);
    }

    #[test]
    fn unknown_axis_lookup_fails() {
        let mut cm = ControlMap::new();
        cm.axis("throttle");
        assert!(cm.find_axis("throttle").is_ok());
        assert!(matches!(cm.find_axis("rudder"), Err(FdmError::UnknownAxis(_))));
    }
}
