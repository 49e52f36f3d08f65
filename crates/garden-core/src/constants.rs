/// Golden angle in degrees. The layout uses the rounded botanical value,
/// not the exact 360 / φ² ≈ 137.508°.
pub const GOLDEN_ANGLE_DEGREES: f64 = 137.5;

/// Golden angle in radians: 137.5° · π / 180
pub const GOLDEN_ANGLE: f64 = 2.399_827_721_492_203_6;

/// Days-since-contact sentinel for a contact with no recorded interaction.
pub const NEVER_CONTACTED_DAYS: u32 = 999;

/// Target cadence used when a contact has none (or a non-positive one).
pub const DEFAULT_TARGET_DAYS: u32 = 30;

/// Population score weights, per state.
pub const WEIGHT_BLOOMING: u32 = 100;
pub const WEIGHT_NOURISHED: u32 = 70;
pub const WEIGHT_THIRSTY: u32 = 40;
pub const WEIGHT_FADING: u32 = 10;

/// Spiral density: C = max(SPIRAL_MIN, SPIRAL_BASE · (REF / max(REF, n))^SPIRAL_EXPONENT)
pub const SPIRAL_MIN: f64 = 2.5;
pub const SPIRAL_BASE: f64 = 4.0;
pub const SPIRAL_EXPONENT: f64 = 0.3;
pub const SPIRAL_REFERENCE_POPULATION: usize = 30;

/// Upper bound on laid-out nodes.
pub const DEFAULT_MAX_NODES: usize = 300;

/// Population above which nodes shrink to the small tier.
pub const LARGE_POPULATION: usize = 100;

/// Population above which nodes shrink to the medium tier.
pub const MEDIUM_POPULATION: usize = 50;

/// Node diameters in layout units for the small, medium and large tiers.
pub const NODE_SIZE_SMALL: f64 = 1.2;
pub const NODE_SIZE_MEDIUM: f64 = 1.8;
pub const NODE_SIZE_LARGE: f64 = 2.6;

/// Cosmetic rotation range in degrees: [-ROTATION_SPREAD, +ROTATION_SPREAD].
pub const ROTATION_SPREAD: i32 = 15;

/// Default triage queue length.
pub const DEFAULT_QUEUE_SIZE: usize = 5;

/// Fraction of the current healthy count a decay deficit may reach before
/// the forecast turns Stormy.
pub const STORM_TOLERANCE_RATIO: f64 = 0.1;
