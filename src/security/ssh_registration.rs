//! One-time-code generation for binding an unrecognized SSH fingerprint to
//! an account, per §4.5's SSH key registration flow.

use rand::distributions::Alphanumeric;
use rand::Rng;

const CODE_LEN: usize = 8;

pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}
