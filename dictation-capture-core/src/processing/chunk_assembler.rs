/// Re-chunks an irregular byte stream into fixed-size blocks.
///
/// Device drivers deliver buffers of whatever size suits them; the session
/// expects chunks of a configured duration. Bytes are held only until a full
/// chunk is available, so memory stays bounded by one chunk.
#[derive(Debug)]
pub struct ChunkAssembler {
    pending: Vec<u8>,
    chunk_bytes: usize,
}

impl ChunkAssembler {
    /// `chunk_bytes` is rounded up to at least one byte.
    pub fn new(chunk_bytes: usize) -> Self {
        let chunk_bytes = chunk_bytes.max(1);
        Self {
            pending: Vec::with_capacity(chunk_bytes),
            chunk_bytes,
        }
    }

    /// Append `bytes`, invoking `emit` for every completed chunk in order.
    pub fn push(&mut self, mut bytes: &[u8], mut emit: impl FnMut(&[u8])) {
        if !self.pending.is_empty() {
            let needed = self.chunk_bytes - self.pending.len();
            let take = needed.min(bytes.len());
            self.pending.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.pending.len() < self.chunk_bytes {
                return;
            }
            emit(&self.pending);
            self.pending.clear();
        }

        let mut full = bytes.chunks_exact(self.chunk_bytes);
        for chunk in &mut full {
            emit(chunk);
        }
        self.pending.extend_from_slice(full.remainder());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(assembler: &mut ChunkAssembler, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        assembler.push(bytes, |chunk| out.push(chunk.to_vec()));
        out
    }

    #[test]
    fn exact_multiple_emits_all() {
        let mut assembler = ChunkAssembler::new(2);
        let chunks = collect(&mut assembler, &[1, 2, 3, 4]);
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4]]);
        assert!(collect(&mut assembler, &[5]).is_empty());
    }

    #[test]
    fn partial_is_held_until_complete() {
        let mut assembler = ChunkAssembler::new(4);
        assert!(collect(&mut assembler, &[1, 2, 3]).is_empty());

        let chunks = collect(&mut assembler, &[4, 5, 6, 7, 8, 9]);
        assert_eq!(chunks, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);

        // The leftover byte leads the next chunk.
        let chunks = collect(&mut assembler, &[10, 11, 12]);
        assert_eq!(chunks, vec![vec![9, 10, 11, 12]]);
    }

    #[test]
    fn small_pushes_accumulate() {
        let mut assembler = ChunkAssembler::new(3);
        assert!(collect(&mut assembler, &[1]).is_empty());
        assert!(collect(&mut assembler, &[2]).is_empty());
        assert_eq!(collect(&mut assembler, &[3]), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn zero_chunk_size_is_raised_to_one() {
        let mut assembler = ChunkAssembler::new(0);
        assert_eq!(collect(&mut assembler, &[1, 2]), vec![vec![1], vec![2]]);
    }
}
