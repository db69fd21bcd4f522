//! Number formatting utilities.

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Format a percentage with no decimals.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

/// Text progress bar of `width` cells for a fraction in `[0, 1]`.
///
/// Fractions outside the range are clamped, so an over-quota account
/// renders as a full bar.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn usage_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let filled = ((fraction * width as f64).round() as usize).min(width);

    let mut bar = String::with_capacity(width * BAR_FILLED.len_utf8());
    bar.extend(std::iter::repeat_n(BAR_FILLED, filled));
    bar.extend(std::iter::repeat_n(BAR_EMPTY, width - filled));
    bar
}
