//! Identifier and time utilities
//!
//! `new_id()` returns a 26-character lexicographically sortable ID: a
//! 10-character base32 millisecond timestamp prefix followed by a
//! 16-character base32 random suffix (the same shape as a ULID). IDs
//! minted within the same millisecond increment monotonically by treating
//! the previous suffix as a big-endian counter and incrementing it;
//! overflow rolls over to the next millisecond so ordering is preserved
//! even under a random-suffix collision.
//!
//! `now()` returns a timestamp string whose lexical order matches
//! chronological order, with millisecond precision. Cursor pagination and
//! history ordering rely on string comparison only — never on parsing.

use std::sync::Mutex;

use chrono::Utc;

/// Crockford's base32 alphabet (no I, L, O, U to avoid visual ambiguity).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

struct MonotonicState {
    last_millis: u64,
    last_suffix: [u8; 16],
}

static STATE: Mutex<Option<MonotonicState>> = Mutex::new(None);

fn encode_millis(mut millis: u64) -> [u8; 10] {
    let mut out = [ALPHABET[0]; 10];
    for i in (0..10).rev() {
        out[i] = ALPHABET[(millis & 0x1f) as usize];
        millis >>= 5;
    }
    out
}

fn random_suffix() -> [u8; 16] {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut out = [0u8; 16];
    for slot in out.iter_mut() {
        *slot = ALPHABET[rng.gen_range(0..32)];
    }
    out
}

/// Increment a base32 suffix treated as a big-endian counter. Returns
/// `true` on overflow (all digits wrapped past the top of the alphabet).
fn increment_suffix(suffix: &mut [u8; 16]) -> bool {
    for i in (0..16).rev() {
        let idx = ALPHABET.iter().position(|&c| c == suffix[i]).unwrap_or(0);
        if idx + 1 < 32 {
            suffix[i] = ALPHABET[idx + 1];
            return false;
        }
        suffix[i] = ALPHABET[0];
    }
    true
}

/// Mint a new 26-character lexicographically sortable ID.
///
/// IDs minted within the same millisecond are strictly increasing: the
/// random suffix from the previous call in that millisecond is
/// incremented rather than re-randomized. A suffix that overflows rolls
/// the ID onto the next millisecond so monotonicity never breaks.
pub fn new_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut guard = STATE.lock().unwrap_or_else(|e| e.into_inner());

    let suffix = match guard.as_mut() {
        Some(state) if state.last_millis == millis => {
            let overflowed = increment_suffix(&mut state.last_suffix);
            if overflowed {
                state.last_millis = millis + 1;
                state.last_suffix = random_suffix();
            }
            state.last_suffix
        }
        _ => {
            let suffix = random_suffix();
            *guard = Some(MonotonicState {
                last_millis: millis,
                last_suffix: suffix,
            });
            suffix
        }
    };

    let effective_millis = guard.as_ref().map(|s| s.last_millis).unwrap_or(millis);
    let prefix = encode_millis(effective_millis);

    let mut id = String::with_capacity(26);
    id.push_str(std::str::from_utf8(&prefix).unwrap());
    id.push_str(std::str::from_utf8(&suffix).unwrap());
    id
}

/// A timestamp string whose lexical order matches chronological order,
/// with millisecond precision (RFC 3339, e.g. `2026-07-27T12:34:56.789Z`).
pub fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_26_chars() {
        let id = new_id();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn ids_in_same_call_are_monotonic() {
        let mut ids: Vec<String> = (0..200).map(|_| new_id()).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort();
            s
        };
        // Dedup: two calls in the exact same millisecond must still be
        // strictly increasing due to the incrementing suffix.
        ids.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn ids_are_unique() {
        use std::collections::HashSet;
        let ids: HashSet<String> = (0..500).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn now_is_lexically_sortable() {
        let a = now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now();
        assert!(a < b);
    }

    #[test]
    fn now_has_millisecond_precision() {
        let ts = now();
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('.'));
    }
}
