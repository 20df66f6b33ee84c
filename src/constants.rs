pub const MISSING: f64 = f64::NAN;
pub const VALIDATION_FRACTION: f32 = 0.2;
pub const DEFAULT_SEED: u64 = 0;
pub const GAIN_EPSILON: f64 = 1e-12;
