use rand::{Rng, RngCore};

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Replace letters and digits with random ones of the same class.
/// Whitespace, punctuation and `preserve` characters are kept, so the
/// output has the same length and layout as the input.
pub(crate) fn scramble(rng: &mut impl RngCore, input: &str, preserve: &[char]) -> String {
    input
        .chars()
        .map(|ch| {
            if preserve.contains(&ch) {
                return ch;
            }
            let pool = if ch.is_ascii_digit() || (ch.is_numeric() && !ch.is_ascii()) {
                DIGITS
            } else if ch.is_uppercase() {
                UPPER
            } else if ch.is_alphabetic() {
                LOWER
            } else {
                return ch;
            };
            char::from(pool[rng.random_range(0..pool.len())])
        })
        .collect()
}
