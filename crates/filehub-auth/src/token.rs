//! Share link token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand_core::{OsRng, RngCore};

/// Random bytes per token (256 bits).
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Encoded token length: 32 bytes in unpadded base64.
pub const SHARE_TOKEN_LEN: usize = 43;

/// Generate a share token from the operating system CSPRNG, encoded as
/// URL-safe base64 without padding.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
