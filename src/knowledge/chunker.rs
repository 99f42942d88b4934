//! Document chunking for ingestion

/// Target chunk size in characters
const CHUNK_SIZE: usize = 1000;

/// Overlap between consecutive chunks in characters
const CHUNK_OVERLAP: usize = 200;

/// Split a document into overlapping character chunks
///
/// Chunks are cut at whitespace where possible so words stay intact.
/// Consecutive chunks overlap so facts spanning a boundary survive in at
/// least one chunk.
#[must_use]
pub fn chunk_text(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= CHUNK_SIZE {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + CHUNK_SIZE).min(chars.len());

        // Back off to the last whitespace inside the window
        if end < chars.len() {
            if let Some(offset) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if offset > CHUNK_SIZE / 2 {
                    end = start + offset;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(CHUNK_OVERLAP);
    }

    chunks
}
