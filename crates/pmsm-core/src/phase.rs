//! Sensorless 24-step phase and speed estimation from two analog samples.
//!
//! The third phase is reconstructed from the first two. Each phase is then
//! paired with a lead and a lag companion, shifted by 1/48 of a cycle using
//! only shifts and subtraction. A fixed comparator table turns those six
//! signals into a phase code in `0..24`. Successive codes are unwrapped and
//! summed into a velocity that is published once the call counter has
//! reached `sampling_interval`, i.e. every `sampling_interval + 1` calls.

use serde::{Deserialize, Serialize};

/// Phase codes per electrical cycle.
pub const PHASE_STEPS: u8 = 24;
/// Forward steps at or beyond this size are treated as noise.
pub const GLITCH_STEP: u8 = PHASE_STEPS / 2;
/// Comparator threshold for the recentered signals.
pub const DEFAULT_NEUTRAL: i32 = 103;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderParams {
    pub neutral: i32,
    /// Counter value at which velocity is published; a window spans
    /// `sampling_interval + 1` calls, so 0 publishes on every call.
    pub sampling_interval: u32,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            neutral: DEFAULT_NEUTRAL,
            sampling_interval: 100,
        }
    }
}

/// The six lead/lag comparator inputs derived from one sample pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparators {
    pub u_del: i32,
    pub u_adv: i32,
    pub v_del: i32,
    pub v_adv: i32,
    pub w_del: i32,
    pub w_adv: i32,
}

/// Quarter amplitude minus a sixteenth: 3/16 of `x` in shifts.
fn shift_correction(x: i32) -> i32 {
    let quarter = x >> 2;
    quarter - (quarter >> 2)
}

impl Comparators {
    pub fn from_samples(sample_u: u8, sample_v: u8) -> Self {
        let half_u = i32::from(sample_u) >> 1;
        let half_v = i32::from(sample_v) >> 1;
        // Already centered on 128 for a balanced three-phase input.
        let w = 255 - half_u - half_v;
        let u = half_u + 64;
        let v = half_v + 64;

        let from_v = shift_correction(v);
        let from_w = shift_correction(w);
        let from_u = shift_correction(u);
        Self {
            u_del: u - from_v,
            w_adv: w - from_v,
            v_del: v - from_w,
            u_adv: u - from_w,
            w_del: w - from_u,
            v_adv: v - from_u,
        }
    }

    fn get(&self, signal: Signal) -> i32 {
        match signal {
            Signal::UDel => self.u_del,
            Signal::UAdv => self.u_adv,
            Signal::VDel => self.v_del,
            Signal::VAdv => self.v_adv,
            Signal::WDel => self.w_del,
            Signal::WAdv => self.w_adv,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    UDel,
    UAdv,
    VDel,
    VAdv,
    WDel,
    WAdv,
}

#[derive(Debug, Clone, Copy)]
enum Condition {
    AboveNeutral(Signal),
    AtMostNeutral(Signal),
    Less(Signal, Signal),
    LessOrEqual(Signal, Signal),
}

impl Condition {
    fn holds(self, c: &Comparators, neutral: i32) -> bool {
        match self {
            Condition::AboveNeutral(s) => neutral < c.get(s),
            Condition::AtMostNeutral(s) => c.get(s) <= neutral,
            Condition::Less(a, b) => c.get(a) < c.get(b),
            Condition::LessOrEqual(a, b) => c.get(a) <= c.get(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    when: Condition,
    phase: u8,
}

/// A branch condition choosing between two ordered rule pairs.
#[derive(Debug, Clone, Copy)]
struct RuleGroup {
    branch: Condition,
    then: [Rule; 2],
    otherwise: [Rule; 2],
}

impl RuleGroup {
    fn apply(&self, c: &Comparators, neutral: i32, phase: u8) -> u8 {
        let rules = if self.branch.holds(c, neutral) {
            &self.then
        } else {
            &self.otherwise
        };
        rules.iter().fold(phase, |current, rule| {
            if rule.when.holds(c, neutral) {
                rule.phase
            } else {
                current
            }
        })
    }
}

const fn rule(when: Condition, phase: u8) -> Rule {
    Rule { when, phase }
}

use Condition::{AboveNeutral, AtMostNeutral, Less, LessOrEqual};
use Signal::{UAdv, UDel, VAdv, VDel, WAdv, WDel};

/// Evaluated in order; a later match overrides every earlier one.
const DECODE_TABLE: [RuleGroup; 6] = [
    RuleGroup {
        branch: AboveNeutral(UDel),
        then: [rule(AtMostNeutral(UAdv), 12), rule(Less(UAdv, VAdv), 1)],
        otherwise: [rule(AboveNeutral(UAdv), 0), rule(LessOrEqual(VAdv, UAdv), 13)],
    },
    RuleGroup {
        branch: AboveNeutral(VDel),
        then: [rule(AtMostNeutral(VAdv), 4), rule(Less(VAdv, WAdv), 17)],
        otherwise: [rule(AboveNeutral(VAdv), 16), rule(LessOrEqual(WAdv, VAdv), 5)],
    },
    RuleGroup {
        branch: AboveNeutral(WDel),
        then: [rule(AtMostNeutral(WAdv), 20), rule(Less(WAdv, UAdv), 9)],
        otherwise: [rule(AboveNeutral(WAdv), 8), rule(LessOrEqual(UAdv, WAdv), 21)],
    },
    RuleGroup {
        branch: Less(UDel, WDel),
        then: [rule(AboveNeutral(UAdv), 11), rule(Less(WAdv, UAdv), 22)],
        otherwise: [rule(AtMostNeutral(UAdv), 23), rule(LessOrEqual(UAdv, WAdv), 10)],
    },
    RuleGroup {
        branch: Less(VDel, UDel),
        then: [rule(AboveNeutral(VAdv), 3), rule(Less(UAdv, VAdv), 14)],
        otherwise: [rule(AtMostNeutral(VAdv), 15), rule(LessOrEqual(VAdv, UAdv), 2)],
    },
    RuleGroup {
        branch: Less(WDel, VDel),
        then: [rule(AboveNeutral(WAdv), 19), rule(Less(VAdv, WAdv), 6)],
        otherwise: [rule(AtMostNeutral(WAdv), 7), rule(LessOrEqual(WAdv, VAdv), 18)],
    },
];

/// Decodes a phase code, returning `held` when no rule fires.
pub fn decode_phase(c: &Comparators, neutral: i32, held: u8) -> u8 {
    DECODE_TABLE
        .iter()
        .fold(held, |phase, group| group.apply(c, neutral, phase))
}

/// Forward distance from `previous` to `decoded` modulo 24, with steps of
/// half a cycle or more discarded as glitches.
pub fn unwrap_step(previous: u8, decoded: u8) -> u8 {
    let ahead = if decoded < previous {
        decoded + PHASE_STEPS
    } else {
        decoded
    };
    let diff = ahead - previous;
    if diff >= GLITCH_STEP {
        0
    } else {
        diff
    }
}

/// Decoder state between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEstimatorState {
    pub comparators: Comparators,
    pub phase: u8,
    pub diff_sum: i32,
    pub velocity: i32,
    pub call_count: u32,
}

/// Output of one decode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReading {
    pub phase: u8,
    /// Phase steps accumulated over the last completed sampling interval.
    pub velocity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseDecoder {
    params: DecoderParams,
    state: PhaseEstimatorState,
}

impl PhaseDecoder {
    pub fn new(params: DecoderParams) -> Self {
        Self {
            params,
            state: PhaseEstimatorState::default(),
        }
    }

    pub fn decode(&mut self, sample_u: u8, sample_v: u8) -> PhaseReading {
        let comparators = Comparators::from_samples(sample_u, sample_v);
        let phase = decode_phase(&comparators, self.params.neutral, self.state.phase);

        let state = &mut self.state;
        state.comparators = comparators;
        state.diff_sum += i32::from(unwrap_step(state.phase, phase));
        state.phase = phase;

        if state.call_count >= self.params.sampling_interval {
            state.velocity = state.diff_sum;
            state.diff_sum = 0;
            state.call_count = 0;
        } else {
            state.call_count += 1;
        }

        PhaseReading {
            phase,
            velocity: state.velocity,
        }
    }

    /// Returns the decoder to its zero state, keeping its parameters.
    pub fn reset(&mut self) {
        self.state = PhaseEstimatorState::default();
    }

    pub fn state(&self) -> &PhaseEstimatorState {
        &self.state
    }

    pub fn params(&self) -> &DecoderParams {
        &self.params
    }

    pub fn set_sampling_interval(&mut self, interval: u32) {
        self.params.sampling_interval = interval;
    }
}
