//! Keyset pagination cursors (§4.3): `cursor = base64url(epoch:id)`.

use base64::Engine;

const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// A decoded keyset cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub epoch: i64,
    pub id: i64,
}

/// Encode a cursor as `base64url(epoch:id)`.
#[must_use]
pub fn encode_cursor(id: i64, epoch: i64) -> String {
    ENGINE.encode(format!("{epoch}:{id}"))
}

/// Decode a cursor string. Malformed, non-base64, non-`epoch:id`, or
/// non-positive-integer cursors decode to `None` rather than erroring — per
/// §4.3, invalid cursors are silently treated as "no cursor".
#[must_use]
pub fn decode_cursor(raw: &str) -> Option<Cursor> {
    let bytes = ENGINE.decode(raw).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (epoch_str, id_str) = text.split_once(':')?;
    let epoch: i64 = epoch_str.parse().ok()?;
    let id: i64 = id_str.parse().ok()?;
    if id <= 0 || epoch <= 0 {
        return None;
    }
    Some(Cursor { epoch, id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_for_positive_integers() {
        let cursor = encode_cursor(42, 1_700_000_000_000);
        let decoded = decode_cursor(&cursor).expect("must decode");
        assert_eq!(decoded, Cursor { epoch: 1_700_000_000_000, id: 42 });
    }

    #[test]
    fn malformed_cursors_decode_to_none() {
        assert!(decode_cursor("not-base64!!!").is_none());
        assert!(decode_cursor(&base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("garbage")).is_none());
    }

    #[test]
    fn zero_and_negative_components_decode_to_none() {
        assert!(decode_cursor(&ENGINE.encode("0:5")).is_none());
        assert!(decode_cursor(&ENGINE.encode("5:0")).is_none());
        assert!(decode_cursor(&ENGINE.encode("-1:5")).is_none());
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_positive_pair(id in 1i64..i64::MAX, epoch in 1i64..i64::MAX) {
            let cursor = encode_cursor(id, epoch);
            let decoded = decode_cursor(&cursor);
            prop_assert_eq!(decoded, Some(Cursor { epoch, id }));
        }
    }
}
