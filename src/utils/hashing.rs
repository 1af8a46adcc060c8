/// Jenkins one-at-a-time hash over the bytes of `name`.
pub fn calculate_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for &byte in name.as_bytes() {
        hash = hash.wrapping_add(byte as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

pub fn bucket_index(hash: u32, num_buckets: usize) -> usize {
    // u32 -> usize never truncates on the targets we build for
    hash as usize % num_buckets
}
