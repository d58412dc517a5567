//! Crash-point distribution
//!
//! The house edge lives here: most rounds crash early, a thin tail pays
//! big. The draw is a pure function of a uniform source so tests can
//! script it.
//!
//! Bands, first match wins:
//!   75%  -> [1.00, 1.30)
//!   15%  -> [1.30, 2.00)
//!    8%  -> [2.00, 5.00)
//!    2%  -> [5.00, 20.00)

/// Source of uniform values in [0, 1). Boxed so the engine can swap a
/// seeded or scripted source in for the entropy-backed default.
pub type UniformSource = Box<dyn FnMut() -> f64 + Send>;

/// Uniform source backed by OS entropy.
pub fn entropy_source() -> UniformSource {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::from_entropy();
    Box::new(move || rng.gen::<f64>())
}

/// Uniform source replaying a fixed script, then returning 0.0. Test use.
pub fn scripted_source(values: Vec<f64>) -> UniformSource {
    let mut iter = values.into_iter();
    Box::new(move || iter.next().unwrap_or(0.0))
}

/// Multiplier resolution is two decimals; crash points are integers in
/// hundredths: 100 = 1.00x.
pub const ONE_X: u32 = 100;

/// Largest representable crash point, exclusive bound 20.00x.
pub const MAX_CRASH_POINT: u32 = 1_999;

/// Draw one crash point, consuming two uniforms: one to pick the band,
/// one for the position within it. Result is in hundredths, always within
/// [1.00, 20.00).
pub fn draw_crash_point(uniform: &mut UniformSource) -> u32 {
    let band = uniform();
    let position = uniform();

    let multiplier = if band < 0.75 {
        1.00 + position * 0.30
    } else if band < 0.90 {
        1.30 + position * 0.70
    } else if band < 0.98 {
        2.00 + position * 3.00
    } else {
        5.00 + position * 15.00
    };

    // Round to the nearest hundredth; the top of the last band rounds to
    // 20.00 which is outside the supported range, so clamp just under.
    (((multiplier * 100.0).round()) as u32).clamp(ONE_X, MAX_CRASH_POINT)
}

/// Render a hundredths multiplier as the decimal clients see.
pub fn as_decimal(hundredths: u32) -> f64 {
    hundredths as f64 / 100.0
}
