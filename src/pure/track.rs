//! Track size parsing and the grid engine's axis-sizing algorithm.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single column or row track, carrying a sizing rule.
///
/// Immutable after parsing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind")]
pub enum TrackSize {
    /// A positive fractional weight: remaining space is shared between all
    /// fractional (and the fractional component of min-max) tracks on the
    /// axis in proportion to weight.
    Fr { weight: f64 },
    /// A fixed pixel length, non-negative.
    Px { length: f64 },
    /// No additional data; contributes zero length to the axis.
    Auto,
    /// A minimum pixel length plus a fractional weight participating in the
    /// fractional pool.
    MinMax { min: f64, weight: f64 },
}

impl TrackSize {
    fn fr_weight(&self) -> f64 {
        match self {
            TrackSize::Fr { weight } => *weight,
            TrackSize::MinMax { weight, .. } => *weight,
            _ => 0.0,
        }
    }
}

/// Parse a track-size string: `<number>fr`, `<number>px`, `auto`, or
/// `minmax(<number>px, <number>fr)`.
pub fn parse_track_size(raw: &str) -> Result<TrackSize> {
    let s = raw.trim();

    if s.eq_ignore_ascii_case("auto") {
        return Ok(TrackSize::Auto);
    }

    if let Some(inner) = s
        .strip_prefix("minmax(")
        .and_then(|s| s.strip_suffix(')'))
    {
        let mut parts = inner.split(',').map(str::trim);
        let min_raw = parts
            .next()
            .ok_or_else(|| Error::Config(format!("invalid minmax() track: {raw}")))?;
        let fr_raw = parts
            .next()
            .ok_or_else(|| Error::Config(format!("invalid minmax() track: {raw}")))?;

        let min = min_raw
            .strip_suffix("px")
            .ok_or_else(|| Error::Config(format!("minmax() minimum must end in px: {raw}")))?
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("invalid minmax() minimum: {raw}")))?;

        let weight = fr_raw
            .strip_suffix("fr")
            .ok_or_else(|| Error::Config(format!("minmax() weight must end in fr: {raw}")))?
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("invalid minmax() weight: {raw}")))?;

        return Ok(TrackSize::MinMax { min, weight });
    }

    if let Some(num) = s.strip_suffix("fr") {
        let weight = num
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("invalid fr track: {raw}")))?;
        return Ok(TrackSize::Fr { weight });
    }

    if let Some(num) = s.strip_suffix("px") {
        let length = num
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("invalid px track: {raw}")))?;
        return Ok(TrackSize::Px { length });
    }

    Err(Error::Config(format!("unrecognised track size: {raw}")))
}

/// Resolve the final pixel length of every track on one axis.
///
/// `available = axis_extent - gap * (n - 1)`. Deliberately does not
/// iterate to convergence when min-max minimums oversubscribe the axis;
/// see `minmax_oversubscription_is_preserved_not_renormalized` below.
pub fn size_tracks(tracks: &[TrackSize], axis_extent: f64, gap: f64) -> Vec<f64> {
    let n = tracks.len();
    if n == 0 {
        return Vec::new();
    }

    let available = (axis_extent - gap * (n.saturating_sub(1)) as f64).max(0.0);
    let mut remaining = available;
    let mut sizes = vec![0.0; n];

    for (i, t) in tracks.iter().enumerate() {
        match t {
            TrackSize::Px { length } => {
                sizes[i] = length.max(0.0);
                remaining -= sizes[i];
            }
            TrackSize::MinMax { min, .. } => {
                sizes[i] = min.max(0.0);
                remaining -= sizes[i];
            }
            TrackSize::Auto | TrackSize::Fr { .. } => {}
        }
    }

    let total_fr: f64 = tracks.iter().map(TrackSize::fr_weight).sum();

    if total_fr > 0.0 && remaining > 0.0 {
        let fr_unit = remaining / total_fr;

        for (i, t) in tracks.iter().enumerate() {
            match t {
                TrackSize::Fr { weight } => sizes[i] = (fr_unit * weight).max(0.0),
                TrackSize::MinMax { min, weight } => {
                    sizes[i] = (min + fr_unit * weight).max(*min)
                }
                TrackSize::Auto | TrackSize::Px { .. } => {}
            }
        }
    }

    for s in sizes.iter_mut() {
        if *s < 0.0 {
            *s = 0.0;
        }
    }

    sizes
}

/// Cumulative start offsets for a sequence of track sizes with `gap`
/// between adjacent tracks, starting at `origin`.
pub fn track_starts(sizes: &[f64], gap: f64, origin: f64) -> Vec<f64> {
    let mut starts = Vec::with_capacity(sizes.len());
    let mut cursor = origin;

    for &size in sizes {
        starts.push(cursor);
        cursor += size + gap;
    }

    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("1fr", TrackSize::Fr { weight: 1.0 }; "simple fr")]
    #[test_case(" 2.5fr ", TrackSize::Fr { weight: 2.5 }; "fr with whitespace")]
    #[test_case("300px", TrackSize::Px { length: 300.0 }; "simple px")]
    #[test_case("auto", TrackSize::Auto; "auto")]
    #[test_case("minmax(200px, 1fr)", TrackSize::MinMax { min: 200.0, weight: 1.0 }; "minmax")]
    #[test]
    fn parse_valid(raw: &str, expected: TrackSize) {
        assert_eq!(parse_track_size(raw).unwrap(), expected);
    }

    #[test]
    fn parse_invalid_is_an_error() {
        assert!(parse_track_size("3").is_err());
        assert!(parse_track_size("minmax(200px)").is_err());
    }

    #[test]
    fn equal_split_two_columns() {
        let tracks = vec![TrackSize::Fr { weight: 1.0 }, TrackSize::Fr { weight: 1.0 }];
        let sizes = size_tracks(&tracks, 1000.0, 0.0);

        assert_eq!(sizes, vec![500.0, 500.0]);
    }

    #[test]
    fn mixed_tracks_with_gap() {
        let tracks = vec![
            TrackSize::Px { length: 300.0 },
            TrackSize::Fr { weight: 1.0 },
            TrackSize::Fr { weight: 2.0 },
        ];
        let sizes = size_tracks(&tracks, 3000.0, 10.0);

        assert!((sizes[0] - 300.0).abs() < 1e-6);
        assert!((sizes[1] - 893.333_333).abs() < 1e-3);
        assert!((sizes[2] - 1786.666_666).abs() < 1e-3);
    }

    #[test]
    fn track_sizing_conserves_space() {
        let tracks = vec![
            TrackSize::Px { length: 50.0 },
            TrackSize::Fr { weight: 1.0 },
            TrackSize::Fr { weight: 3.0 },
            TrackSize::Auto,
        ];
        let gap = 8.0;
        let axis = 1234.0;
        let sizes = size_tracks(&tracks, axis, gap);
        let available = axis - gap * (tracks.len() - 1) as f64;

        let total: f64 = sizes.iter().sum();
        assert!(total <= available + 1e-6);
        assert!((total - available).abs() < 1e-6, "fr tracks present => equality");
    }

    #[test]
    fn minmax_oversubscription_is_preserved_not_renormalized() {
        // Two min-max tracks whose minimums alone exceed the available axis.
        let tracks = vec![
            TrackSize::MinMax { min: 800.0, weight: 1.0 },
            TrackSize::MinMax { min: 800.0, weight: 1.0 },
        ];
        let sizes = size_tracks(&tracks, 1000.0, 0.0);

        // Both minimums are honoured even though they sum to more than the
        // available axis length (open question 1).
        assert_eq!(sizes, vec![800.0, 800.0]);
    }

    #[test]
    fn track_starts_accumulate_with_gap() {
        let sizes = vec![100.0, 200.0, 50.0];
        let starts = track_starts(&sizes, 10.0, 5.0);

        assert_eq!(starts, vec![5.0, 115.0, 325.0]);
    }
}
