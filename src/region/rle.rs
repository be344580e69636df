//! Run-length encoding for brush masks.
//!
//! The encoded form is a flat list of `(count, value)` pairs, so its length
//! is always even.

use image::GrayImage;

use crate::error::RegionError;

/// Collapses runs of equal consecutive values into `(count, value)` pairs.
pub fn encode(values: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let mut iter = values.iter().copied();
    let Some(mut current) = iter.next() else {
        return out;
    };
    let mut count = 1u32;
    for value in iter {
        if value == current && count < u32::MAX {
            count += 1;
        } else {
            out.push(count);
            out.push(current);
            current = value;
            count = 1;
        }
    }
    out.push(count);
    out.push(current);
    out
}

/// Expands `(count, value)` pairs.
pub fn decode(pairs: &[u32]) -> Result<Vec<u32>, RegionError> {
    if pairs.len() % 2 != 0 {
        return Err(RegionError::value(format!(
            "rle has odd length {}",
            pairs.len()
        )));
    }
    let total: u64 = pairs.chunks_exact(2).map(|pair| pair[0] as u64).sum();
    let mut out = Vec::with_capacity(total.min(1 << 26) as usize);
    for pair in pairs.chunks_exact(2) {
        out.extend(std::iter::repeat(pair[1]).take(pair[0] as usize));
    }
    Ok(out)
}

/// Encodes a mask, one value per pixel in row-major order.
pub fn encode_mask(mask: &GrayImage) -> Vec<u32> {
    let values: Vec<u32> = mask.as_raw().iter().map(|&v| v as u32).collect();
    encode(&values)
}

/// Fails unless the runs cover exactly `width * height` pixels.
pub fn check_cover(pairs: &[u32], width: u32, height: u32) -> Result<(), RegionError> {
    let expected = width as u64 * height as u64;
    let declared: u64 = pairs.chunks(2).map(|pair| pair[0] as u64).sum();
    if declared != expected {
        return Err(RegionError::value(format!(
            "rle covers {declared} pixels but the mask has {expected}"
        )));
    }
    Ok(())
}

/// Decodes a mask of the given size.
pub fn decode_mask(pairs: &[u32], width: u32, height: u32) -> Result<GrayImage, RegionError> {
    check_cover(pairs, width, height)?;
    let values = decode(pairs)?;
    let raw = values
        .into_iter()
        .map(|v| u8::try_from(v).unwrap_or(u8::MAX))
        .collect();
    GrayImage::from_raw(width, height, raw)
        .ok_or_else(|| RegionError::value("rle does not match the mask size"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_collapse_into_pairs() {
        assert_eq!(encode(&[0, 0, 0, 255, 255, 0]), vec![3, 0, 2, 255, 1, 0]);
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn decode_rejects_odd_length() {
        assert!(decode(&[3, 0, 1]).is_err());
        assert_eq!(decode(&[2, 9, 1, 4]).unwrap(), vec![9, 9, 4]);
    }

    #[test]
    fn mask_size_must_match() {
        let mask = GrayImage::from_raw(2, 2, vec![0, 255, 255, 0]).unwrap();
        let rle = encode_mask(&mask);
        assert_eq!(decode_mask(&rle, 2, 2).unwrap(), mask);
        assert!(decode_mask(&rle, 3, 2).is_err());
    }
}
