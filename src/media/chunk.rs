use std::sync::Arc;

use parking_lot::Mutex;

/// A unit of encoded media emitted by a recorder once per timeslice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunk {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Milliseconds since the recording run started
    pub timestamp_ms: u64,
}

impl MediaChunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ordered chunks of one recording run
///
/// Shared between the relay task (the only writer) and session readers.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    chunks: Arc<Mutex<Vec<MediaChunk>>>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.chunks.lock().clear();
    }

    pub fn push(&self, chunk: MediaChunk) {
        self.chunks.lock().push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }

    /// Total number of buffered bytes
    pub fn size_bytes(&self) -> usize {
        self.chunks.lock().iter().map(MediaChunk::len).sum()
    }

    /// Copy of the buffered chunks in emission order
    pub fn snapshot(&self) -> Vec<MediaChunk> {
        self.chunks.lock().clone()
    }

    /// Concatenate all chunks, in order, into one blob
    pub fn concat(&self) -> Vec<u8> {
        let chunks = self.chunks.lock();
        let total = chunks.iter().map(MediaChunk::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks.iter() {
            data.extend_from_slice(&chunk.data);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: &[u8], timestamp_ms: u64) -> MediaChunk {
        MediaChunk {
            data: bytes.to_vec(),
            timestamp_ms,
        }
    }

    #[test]
    fn concat_preserves_emission_order() {
        let buffer = ChunkBuffer::new();
        buffer.push(chunk(b"ab", 0));
        buffer.push(chunk(b"", 1000));
        buffer.push(chunk(b"cde", 2000));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.size_bytes(), 5);
        assert_eq!(buffer.concat(), b"abcde".to_vec());
    }

    #[test]
    fn clear_empties_shared_handles() {
        let buffer = ChunkBuffer::new();
        let reader = buffer.clone();
        buffer.push(chunk(b"xyz", 0));
        assert_eq!(reader.len(), 1);

        buffer.clear();

        assert!(reader.is_empty());
        assert!(reader.concat().is_empty());
    }
}
