/// Rotate-and-add checksum used throughout the .puz format

/// Running 16-bit checksum over `data`, seeded with `seed`.
///
/// For every byte the accumulator is rotated right by one bit and the byte
/// is added with wraparound. Feeding the result of one call in as the seed
/// of the next is equivalent to checksumming the concatenated input.
pub fn checksum(seed: u16, data: &[u8]) -> u16 {
    data.iter()
        .fold(seed, |sum, &b| sum.rotate_right(1).wrapping_add(b as u16))
}
