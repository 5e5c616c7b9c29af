//! License key generation.

use rand::Rng;

/// Unambiguous alphabet: no `0`/`O`, `1`/`I`.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUPS: usize = 5;
const GROUP_LEN: usize = 5;

/// Source of license key values.
///
/// Generators only promise statistical uniqueness. The store enforces real
/// uniqueness, and issuance treats a duplicate value as a collision to retry.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, service_id: &str) -> String;
}

/// Random keys in `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX` form (125 bits).
///
/// The service id is not part of the key, so nothing about a key can be
/// derived from the service that owns it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, _service_id: &str) -> String {
        let mut rng = rand::thread_rng();
        let mut part = || -> String {
            (0..GROUP_LEN)
                .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
                .collect()
        };

        let groups: Vec<String> = (0..GROUPS).map(|_| part()).collect();
        groups.join("-")
    }
}
