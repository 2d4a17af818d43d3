//! XOR masking of WebSocket payloads ([RFC 6455 Section 5.3](https://datatracker.ietf.org/doc/html/rfc6455#section-5.3)).
//!
//! Every function here computes `output[i] = input[i] ^ key[i % key.len()]`.
//! The transform is its own inverse: masking twice with the same key restores
//! the input. The in-place variants never allocate, which matters because
//! masking dominates the cost of encoding and decoding large frames.

use bytes::{Bytes, BytesMut};

/// Mask/unmask a buffer in place with a 4-byte key.
///
/// Short buffers are handled byte by byte; anything longer goes through the
/// 64-bit word loop.
#[inline]
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    if buf.len() < 16 {
        apply_mask_fallback(buf, key);
    } else {
        apply_mask_fast64(buf, key);
    }
}

/// Mask/unmask a buffer in place with a key of any length.
///
/// A 4-byte key takes the word-parallel path of [`apply_mask`]. An empty key
/// leaves the buffer untouched.
pub fn apply_key(buf: &mut [u8], key: &[u8]) {
    match *key {
        [] => {}
        [a, b, c, d] => apply_mask(buf, [a, b, c, d]),
        _ => {
            for (byte, k) in buf.iter_mut().zip(key.iter().cycle()) {
                *byte ^= k;
            }
        }
    }
}

/// Returns a masked copy of `payload`.
///
/// Exactly one output buffer is allocated; the key is then applied to it in
/// place.
pub fn mask(payload: &[u8], key: &[u8]) -> Bytes {
    let mut out = BytesMut::from(payload);
    apply_key(&mut out, key);
    out.freeze()
}

/// A safe unoptimized mask application.
#[inline(always)]
fn apply_mask_fallback(buf: &mut [u8], key: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}

/// Word-parallel masking on 8-byte blocks.
///
/// Blocks start at multiples of 8 from the beginning of `buf`, so the key
/// phase is the same at the start of every block and at the start of the
/// remainder.
#[doc(hidden)]
#[inline(always)]
pub fn apply_mask_fast64(buf: &mut [u8], key: [u8; 4]) {
    let mut doubled = [0u8; 8];
    doubled[..4].copy_from_slice(&key);
    doubled[4..].copy_from_slice(&key);
    let key_u64 = u64::from_ne_bytes(doubled);

    let mut blocks = buf.chunks_exact_mut(8);
    for block in &mut blocks {
        let mut word = [0u8; 8];
        word.copy_from_slice(block);
        let masked = u64::from_ne_bytes(word) ^ key_u64;
        block.copy_from_slice(&masked.to_ne_bytes());
    }

    apply_mask_fallback(blocks.into_remainder(), key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mask() {
        let key = [0x6d, 0xb6, 0xb2, 0x80];
        let unmasked = [
            0xf3, 0x00, 0x01, 0x02, 0x03, 0x80, 0x81, 0x82, 0xff, 0xfe, 0x00, 0x17, 0x74, 0xf9,
            0x12, 0x03, 0x44, 0x91, 0x07,
        ];

        for data_len in 0..=unmasked.len() {
            let unmasked = &unmasked[0..data_len];
            // Sub-slices starting at every offset of the key cycle.
            for off in 0..=3 {
                if unmasked.len() < off {
                    continue;
                }
                let mut masked = unmasked.to_vec();
                apply_mask_fallback(&mut masked[off..], key);

                let mut masked_fast64 = unmasked.to_vec();
                apply_mask_fast64(&mut masked_fast64[off..], key);

                let mut masked_dispatch = unmasked.to_vec();
                apply_mask(&mut masked_dispatch[off..], key);

                assert_eq!(masked, masked_fast64);
                assert_eq!(masked, masked_dispatch);
            }
        }
    }

    #[test]
    fn test_mask_unmask_identity() {
        let key = [0xAA, 0xBB, 0xCC, 0xDD];
        let original = b"Hello, World! This is a test message with various lengths.";

        let mut data = original.to_vec();
        apply_mask(&mut data, key);
        assert_ne!(&data[..], &original[..]);

        apply_mask(&mut data, key);
        assert_eq!(&data[..], &original[..]);
    }

    #[test]
    fn test_mask_hello_websocket() {
        let payload = b"Hello, WebSocket!";
        let key = b"\x01\x02\x03\x04";

        let masked = mask(payload, key);
        assert_ne!(masked.as_ref(), payload);
        assert_eq!(masked[0], b'H' ^ 0x01);
        assert_eq!(masked[4], b'o' ^ 0x01);
        assert_eq!(masked[16], b'!' ^ 0x01);

        let restored = mask(&masked, key);
        assert_eq!(restored.as_ref(), payload);
    }

    #[test]
    fn test_mask_all_zeros() {
        let original = b"Test data";
        let mut data = original.to_vec();
        apply_mask(&mut data, [0; 4]);
        assert_eq!(&data[..], &original[..]);
    }

    #[test]
    fn test_mask_all_ones() {
        let original = vec![0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
        let expected = vec![0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA, 0x99, 0x88];

        let mut data = original.clone();
        apply_mask(&mut data, [0xFF; 4]);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_mask_edge_cases() {
        let key = [0x12, 0x34, 0x56, 0x78];

        let mut empty: Vec<u8> = vec![];
        apply_mask(&mut empty, key);
        assert!(empty.is_empty());

        let mut single = vec![0xAB];
        apply_mask(&mut single, key);
        assert_eq!(single, vec![0xAB ^ 0x12]);

        let mut three = vec![0xAB, 0xCD, 0xEF];
        apply_mask(&mut three, key);
        assert_eq!(three, vec![0xAB ^ 0x12, 0xCD ^ 0x34, 0xEF ^ 0x56]);
    }

    #[test]
    fn test_mask_large_buffer() {
        let key = [0x01, 0x02, 0x03, 0x04];
        let mut data: Vec<u8> = (0..10_003).map(|i| (i % 256) as u8).collect();
        let original = data.clone();

        apply_mask(&mut data, key);

        for (i, &byte) in data.iter().enumerate() {
            assert_eq!(byte, original[i] ^ key[i % 4], "Mismatch at index {}", i);
        }
    }

    #[test]
    fn test_fast_matches_fallback() {
        let keys = [
            [0x00, 0x00, 0x00, 0x00],
            [0xFF, 0xFF, 0xFF, 0xFF],
            [0x12, 0x34, 0x56, 0x78],
            [0x01, 0x23, 0x45, 0x67],
        ];

        for key in keys {
            for size in 0..=200 {
                let data: Vec<u8> = (0..size).map(|i| (i * 7) as u8).collect();

                let mut fallback = data.clone();
                apply_mask_fallback(&mut fallback, key);

                let mut fast = data.clone();
                apply_mask_fast64(&mut fast, key);

                assert_eq!(fallback, fast, "mismatch for key {:?} with size {}", key, size);
            }
        }
    }

    #[test]
    fn test_apply_key_generic_lengths() {
        let data: Vec<u8> = (0..50u8).collect();

        let mut three = data.clone();
        apply_key(&mut three, &[0x10, 0x20, 0x30]);
        for (i, &byte) in three.iter().enumerate() {
            assert_eq!(byte, data[i] ^ [0x10, 0x20, 0x30][i % 3]);
        }

        let mut four = data.clone();
        apply_key(&mut four, &[1, 2, 3, 4]);
        let mut expected = data.clone();
        apply_mask_fallback(&mut expected, [1, 2, 3, 4]);
        assert_eq!(four, expected);

        let mut untouched = data.clone();
        apply_key(&mut untouched, &[]);
        assert_eq!(untouched, data);
    }
}
