//! Chunk file names.
//!
//! Each coordinate is a sign character followed by the lowercase hex
//! magnitude: `chunk_+0_+1a_-1.abt`. Every `i64` has exactly one spelling,
//! so names never collide and can be parsed back.

use abtworld_chunk::ChunkPos;

const PREFIX: &str = "chunk_";
const SUFFIX: &str = ".abt";

fn encode_coord(v: i64) -> String {
    let sign = if v < 0 { '-' } else { '+' };
    format!("{}{:x}", sign, v.unsigned_abs())
}

fn decode_coord(s: &str) -> Option<i64> {
    let (negative, hex) = match s.split_at_checked(1)? {
        ("+", rest) => (false, rest),
        ("-", rest) => (true, rest),
        _ => return None,
    };
    let canonical = !hex.is_empty()
        && hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        && (hex == "0" || !hex.starts_with('0'));
    if !canonical {
        return None;
    }
    let magnitude = u64::from_str_radix(hex, 16).ok()?;
    if negative {
        if magnitude == 0 {
            return None;
        }
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

pub fn chunk_file_name(pos: ChunkPos) -> String {
    format!(
        "{}{}_{}_{}{}",
        PREFIX,
        encode_coord(pos.x),
        encode_coord(pos.y),
        encode_coord(pos.z),
        SUFFIX
    )
}

/// Inverse of [`chunk_file_name`]; `None` for anything it would not produce.
pub fn parse_chunk_file_name(name: &str) -> Option<ChunkPos> {
    let body = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let mut parts = body.split('_');
    let x = decode_coord(parts.next()?)?;
    let y = decode_coord(parts.next()?)?;
    let z = decode_coord(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(ChunkPos::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(chunk_file_name(ChunkPos::new(0, 0, 0)), "chunk_+0_+0_+0.abt");
        assert_eq!(chunk_file_name(ChunkPos::new(26, -1, 255)), "chunk_+1a_-1_+ff.abt");
        assert_eq!(
            chunk_file_name(ChunkPos::new(i64::MIN, i64::MAX, 0)),
            "chunk_-8000000000000000_+7fffffffffffffff_+0.abt"
        );
    }

    #[test]
    fn test_negative_one_differs_from_large_positive() {
        let neg = chunk_file_name(ChunkPos::new(-1, 0, 0));
        let pos = chunk_file_name(ChunkPos::new(u32::MAX as i64, 0, 0));
        let wide = chunk_file_name(ChunkPos::new(i64::MAX, 0, 0));
        assert_ne!(neg, pos);
        assert_ne!(neg, wide);
    }

    #[test]
    fn test_parse_round_trip() {
        let coords = [0, 1, -1, 15, -16, 4096, -4097, i64::MAX, i64::MIN, i64::MIN + 1];
        for &x in &coords {
            for &z in &coords {
                let pos = ChunkPos::new(x, -x.wrapping_add(3), z);
                assert_eq!(parse_chunk_file_name(&chunk_file_name(pos)), Some(pos));
            }
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        for name in [
            "map.abt",
            "chunk_0_0_0.abt",
            "chunk_+0_+0.abt",
            "chunk_+0_+0_+0_+0.abt",
            "chunk_-0_+0_+0.abt",
            "chunk_+01_+0_+0.abt",
            "chunk_+A_+0_+0.abt",
            "chunk_+_+0_+0.abt",
            "chunk_+8000000000000000_+0_+0.abt",
            "chunk_-8000000000000001_+0_+0.abt",
            "chunk_+0_+0_+0.abt.tmp",
        ] {
            assert_eq!(parse_chunk_file_name(name), None, "{}", name);
        }
    }
}
