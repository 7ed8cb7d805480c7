//! Compact polyline codec and step-instruction cleanup.
//!
//! Directions providers ship route geometry as an encoded polyline: each point is
//! a pair of deltas from the previous point, scaled by 1e5, zig-zag signed, and
//! split into 5-bit chunks offset by 63 with `0x20` as the continuation bit.
//! Decoding has to reproduce the algorithm byte for byte; a single off-by-one
//! shifts every following point.

use crate::error::PolylineError;
use crate::geo::Coordinate;

const PRECISION: f64 = 1e5;
const CHUNK_OFFSET: u8 = 63;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
/// Largest shift that still fits a value in 32 bits (7 chunks).
const MAX_SHIFT: u32 = 30;

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Decoder<'_> {
    fn is_exhausted(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn next_delta(&mut self) -> Result<i64, PolylineError> {
        let start = self.offset;
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            let Some(&byte) = self.bytes.get(self.offset) else {
                return Err(PolylineError::Truncated {
                    offset: self.offset,
                });
            };
            if !(CHUNK_OFFSET..=126).contains(&byte) {
                return Err(PolylineError::InvalidByte {
                    offset: self.offset,
                    byte,
                });
            }
            if shift > MAX_SHIFT {
                return Err(PolylineError::Overflow { offset: start });
            }
            self.offset += 1;

            let chunk = i64::from(byte - CHUNK_OFFSET);
            result |= (chunk & CHUNK_MASK) << shift;
            shift += 5;
            if chunk < CONTINUATION_BIT {
                break;
            }
        }

        Ok(if result & 1 != 0 {
            !(result >> 1)
        } else {
            result >> 1
        })
    }
}

/// Decode an encoded polyline into its ordered list of points.
///
/// Decoding runs until the input is exhausted; an empty string is an empty path.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let mut decoder = Decoder {
        bytes: encoded.as_bytes(),
        offset: 0,
    };
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut path = Vec::new();

    while !decoder.is_exhausted() {
        lat += decoder.next_delta()?;
        lng += decoder.next_delta()?;
        path.push(Coordinate {
            latitude: lat as f64 / PRECISION,
            longitude: lng as f64 / PRECISION,
        });
    }

    Ok(path)
}

fn encode_delta(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        let chunk = (CONTINUATION_BIT | (value & CHUNK_MASK)) as u8 + CHUNK_OFFSET;
        out.push(char::from(chunk));
        value >>= 5;
    }
    out.push(char::from(value as u8 + CHUNK_OFFSET));
}

/// Encode points with 1e5 precision. Inverse of [`decode`] up to that precision.
pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;
    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lng = (point.longitude * PRECISION).round() as i64;
        encode_delta(lat - prev_lat, &mut out);
        encode_delta(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }
    out
}

/// Remove `<...>` tags from a step instruction and un-escape `&nbsp;` and `&amp;`.
///
/// Not a sanitizer: any other entity passes through untouched, and a `<` without
/// a closing `>` (or an empty `<>`) is kept as text.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) if end > 0 => rest = &after[end + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.replace("&nbsp;", " ").replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn reference_points() -> Vec<Coordinate> {
        vec![
            Coordinate {
                latitude: 38.5,
                longitude: -120.2,
            },
            Coordinate {
                latitude: 40.7,
                longitude: -120.95,
            },
            Coordinate {
                latitude: 43.252,
                longitude: -126.453,
            },
        ]
    }

    #[test]
    fn decodes_reference_fixture() {
        let points = decode(REFERENCE).expect("valid polyline");
        assert_eq!(points, reference_points());
    }

    #[test]
    fn encodes_reference_fixture() {
        assert_eq!(encode(&reference_points()), REFERENCE);
    }

    #[test]
    fn empty_input_is_empty_path() {
        assert_eq!(decode(""), Ok(Vec::new()));
    }

    #[test]
    fn truncated_value_is_reported() {
        // Drop the last byte of the final longitude.
        let truncated = &REFERENCE[..REFERENCE.len() - 1];
        assert!(matches!(
            decode(truncated),
            Err(PolylineError::Truncated { .. })
        ));

        // A lone latitude with no longitude is also incomplete.
        assert_eq!(
            decode("_p~iF"),
            Err(PolylineError::Truncated { offset: 5 })
        );
    }

    #[test]
    fn bytes_below_offset_are_rejected() {
        assert_eq!(
            decode("_p~iF ps|U"),
            Err(PolylineError::InvalidByte {
                offset: 5,
                byte: b' '
            })
        );
    }

    #[test]
    fn endless_continuation_overflows() {
        assert!(matches!(
            decode("~~~~~~~~~~"),
            Err(PolylineError::Overflow { offset: 0 })
        ));
    }

    #[test]
    fn strip_markup_removes_tags_and_known_entities() {
        assert_eq!(
            strip_markup("Turn <b>left</b> onto <div style=\"x\">Main&nbsp;St</div>"),
            "Turn left onto Main St"
        );
        assert_eq!(strip_markup("Fish &amp; Chips"), "Fish & Chips");
    }

    #[test]
    fn strip_markup_passes_unknown_entities_and_stray_brackets() {
        assert_eq!(strip_markup("a &lt; b &copy;"), "a &lt; b &copy;");
        assert_eq!(strip_markup("1 < 2"), "1 < 2");
        assert_eq!(strip_markup("a <> b"), "a <> b");
        assert_eq!(strip_markup("no tags"), "no tags");
    }
}
