//! 24-step sinusoidal drive duties, the commutation side paired with the
//! phase decoder.
//!
//! Each step packs three 4-bit selectors: bits 0-1 pick a column of the
//! amplitude row, bit 2 drives below mid-scale and bit 3 forces mid-scale.

use serde::{Deserialize, Serialize};

use crate::phase::PHASE_STEPS;

/// Highest amplitude level in the table.
pub const MAX_AMPLITUDE: u8 = 61;

const COLUMN_MASK: u8 = 0x3;
const NEGATE: u8 = 0x4;
const ZERO: u8 = 0x8;
const MID_SCALE: i16 = 128;

/// Drive magnitudes per amplitude level; columns are the four step offsets.
const LEVELS: [[u8; 4]; 62] = [
    [0, 0, 0, 0],
    [3, 6, 7, 8],
    [4, 7, 9, 10],
    [5, 9, 11, 12],
    [6, 10, 13, 14],
    [7, 12, 15, 16],
    [7, 13, 17, 18],
    [8, 15, 18, 20],
    [9, 16, 20, 22],
    [10, 18, 22, 24],
    [11, 19, 24, 26],
    [11, 20, 26, 28],
    [12, 22, 28, 30],
    [13, 23, 30, 32],
    [14, 25, 31, 34],
    [15, 26, 33, 36],
    [15, 28, 35, 38],
    [16, 29, 37, 40],
    [17, 31, 39, 42],
    [18, 32, 41, 44],
    [19, 34, 42, 46],
    [20, 35, 44, 48],
    [20, 36, 46, 50],
    [21, 38, 48, 52],
    [22, 39, 50, 54],
    [23, 41, 52, 56],
    [24, 42, 53, 58],
    [24, 44, 55, 60],
    [25, 45, 57, 62],
    [26, 47, 59, 64],
    [27, 48, 61, 66],
    [28, 50, 63, 68],
    [28, 51, 65, 70],
    [29, 53, 66, 72],
    [30, 54, 68, 74],
    [31, 55, 70, 76],
    [32, 57, 72, 78],
    [33, 58, 74, 80],
    [33, 60, 76, 82],
    [34, 61, 77, 84],
    [35, 63, 79, 86],
    [36, 64, 81, 88],
    [37, 66, 83, 90],
    [37, 67, 85, 92],
    [38, 69, 87, 94],
    [39, 70, 89, 96],
    [40, 71, 90, 98],
    [41, 73, 92, 99],
    [42, 74, 94, 101],
    [42, 76, 96, 103],
    [43, 77, 98, 105],
    [44, 79, 100, 107],
    [45, 80, 101, 109],
    [46, 82, 103, 111],
    [46, 83, 105, 113],
    [47, 85, 107, 115],
    [48, 86, 109, 117],
    [49, 88, 111, 119],
    [50, 89, 112, 121],
    [50, 90, 114, 123],
    [51, 92, 116, 125],
    [52, 93, 118, 127],
];

/// Per step: U selector, then V (low nibble) and W (high nibble) selectors.
const STEPS: [[u8; 2]; 24] = [
    [0x1, 0x71],
    [0x2, 0x70],
    [0x3, 0x78],
    [0x3, 0x64],
    [0x3, 0x55],
    [0x3, 0x46],
    [0x3, 0x87],
    [0x2, 0x07],
    [0x1, 0x17],
    [0x0, 0x27],
    [0x8, 0x37],
    [0x4, 0x36],
    [0x5, 0x35],
    [0x6, 0x34],
    [0x7, 0x38],
    [0x7, 0x20],
    [0x7, 0x11],
    [0x7, 0x02],
    [0x7, 0x83],
    [0x6, 0x43],
    [0x5, 0x53],
    [0x4, 0x63],
    [0x8, 0x73],
    [0x0, 0x72],
];

/// PWM duty bytes for the three phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveDuty {
    pub u: u8,
    pub v: u8,
    pub w: u8,
}

fn level(row: &[u8; 4], selector: u8) -> u8 {
    let magnitude = if selector & ZERO != 0 {
        0
    } else {
        i16::from(row[usize::from(selector & COLUMN_MASK)])
    };
    let duty = if selector & NEGATE != 0 {
        MID_SCALE - magnitude
    } else {
        MID_SCALE + magnitude
    };
    duty as u8
}

/// Duties at `step` (taken modulo 24) for `amplitude` (clamped to
/// `MAX_AMPLITUDE`).
pub fn duty(amplitude: u8, step: u8) -> DriveDuty {
    let row = &LEVELS[usize::from(amplitude.min(MAX_AMPLITUDE))];
    let [sel_u, packed] = STEPS[usize::from(step % PHASE_STEPS)];
    DriveDuty {
        u: level(row, sel_u),
        v: level(row, packed & 0xF),
        w: level(row, packed >> 4),
    }
}
