use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

/// Width of one SHA-512 digest.
pub const SHA512_LEN: usize = 64;

pub fn sha512(data: &[u8]) -> [u8; SHA512_LEN] {
    let mut h = Sha512::new();
    h.update(data);
    h.finalize().into()
}

/// SHA-512 over several parts, hashed as if concatenated.
pub fn sha512_parts(parts: &[&[u8]]) -> [u8; SHA512_LEN] {
    let mut h = Sha512::new();
    for part in parts {
        h.update(part);
    }
    h.finalize().into()
}

/// Fill `out` with key stream derived from `ikm`.
///
/// The first 64 bytes are `sha512(ikm)`; each following block is the SHA-512
/// of the block before it. Any prefix of the stream is the same regardless
/// of how many bytes are requested.
pub fn expand_sha512(ikm: &[u8], out: &mut [u8]) {
    let mut digest = Zeroizing::new(sha512(ikm));
    let mut chunks = out.chunks_mut(SHA512_LEN).peekable();
    while let Some(chunk) = chunks.next() {
        chunk.copy_from_slice(&digest[..chunk.len()]);
        if chunks.peek().is_some() {
            *digest = sha512(&digest[..]);
        }
    }
}
