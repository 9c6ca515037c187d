use base64::Engine;
use rand::RngCore;

/// Random bytes drawn per id. 24 bytes encode to 32 url-safe characters,
/// which keeps the collision probability negligible at any realistic
/// upload volume.
const ID_BYTES: usize = 24;

/// Generate a fresh object id.
///
/// Safe as a path segment and url component without escaping (alphabet
/// `[A-Za-z0-9_-]`). Purely local: no coordination, no locking, safe to
/// call from any number of workers concurrently.
pub fn generate_id() -> String {
    let mut buf = [0u8; ID_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_use_the_url_safe_alphabet() {
        for _ in 0..100 {
            let id = generate_id();
            assert_eq!(id.len(), 32);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }
    }

    #[test]
    fn ids_do_not_repeat() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_id()));
        }
    }

    #[test]
    fn ids_are_assignable_from_any_thread() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| generate_id()).collect::<Vec<_>>()))
            .collect();

        let mut all = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
    }
}
