//! Whisper audibility

use babel_core::Position;

/// Whether `listener` can hear a whisper from `source`.
///
/// Compares squared distances; a listener exactly `max_range` away is out of range.
pub fn in_range(source: Position, listener: Position, max_range: f32) -> bool {
    source.distance_squared(&listener) < max_range * max_range
}
