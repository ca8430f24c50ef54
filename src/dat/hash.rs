#![forbid(unsafe_code)]

//! Name fingerprinting used by the engine to address archive blobs.
//!
//! The register is a 32-bit LFSR seeded with `1`. Every character of the
//! input contributes eight feedback rounds, even when the character is not
//! ASCII and therefore contributes no input byte. Rounds past the end of the
//! ASCII byte sequence read zero bits.

/// Register bits tapped for feedback, besides the incoming input bit.
const TAP_SIGN: u32 = 1 << 31;
const TAP_21: u32 = 1 << 21;
const TAP_1: u32 = 1 << 1;
const TAP_0: u32 = 1;

/// Fingerprint of `text` exactly as the engine computes it.
pub fn fingerprint(text: &str) -> u32 {
    let bytes: Vec<u8> = text
        .chars()
        .filter(char::is_ascii)
        .map(|c| c as u8)
        .collect();
    let rounds = 8 * text.chars().count();

    let mut reg: u32 = 1;
    let mut j = 0usize;
    let mut mask: u8 = 1;

    for _ in 0..rounds {
        let d = reg & TAP_SIGN != 0;
        let a = reg & TAP_21 != 0;
        let b = reg & TAP_1 != 0;
        let c = reg & TAP_0 != 0;

        reg <<= 1;

        let byte = bytes.get(j).copied().unwrap_or(0);
        let x = byte & mask != 0;

        if d ^ a ^ b ^ c ^ x {
            reg |= 1;
        }

        if mask == 0x80 {
            mask = 1;
            j += 1;
        } else {
            mask <<= 1;
        }
    }

    reg
}

/// Both catalog fingerprints of a name: `(lower-case, upper-case)`.
pub fn case_pair(name: &str) -> (u32, u32) {
    (
        fingerprint(&name.to_lowercase()),
        fingerprint(&name.to_uppercase()),
    )
}

/// 8-digit upper-case hex rendering used in listings.
pub fn hex(fp: u32) -> String {
    format!("{fp:08X}")
}
