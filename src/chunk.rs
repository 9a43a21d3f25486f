//! Fixed-width text chunker.
//!
//! Splits extracted document text into non-overlapping runs of `chunk_size`
//! characters (Unicode scalar values, not bytes). The last chunk may be
//! shorter. Concatenating the chunks in order reproduces the input exactly.
//!
//! Each chunk is addressed as `chunk_<index>`, so identifier `i` always names
//! the i-th chunk of the most recent indexing operation for a collection.

use crate::error::ExtractError;
use crate::extract;
use crate::models::Chunk;

/// Identifier for the chunk at `index`.
pub fn chunk_id(index: usize) -> String {
    format!("chunk_{}", index)
}

/// Split text into fixed-size chunks with contiguous indices starting at 0.
///
/// Returns no chunks for empty text. `chunk_size` must be positive; callers
/// validate it before getting here.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<Chunk> {
    debug_assert!(chunk_size > 0, "chunk_size must be > 0");
    let chunk_size = chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (byte_pos, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(make_chunk(chunks.len(), &text[start..byte_pos]));
            start = byte_pos;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(make_chunk(chunks.len(), &text[start..]));
    }

    chunks
}

/// Extract a document page by page and chunk the joined text.
pub fn chunk_document(
    bytes: &[u8],
    content_type: &str,
    chunk_size: usize,
) -> Result<Vec<Chunk>, ExtractError> {
    let pages = extract::extract_pages(bytes, content_type)?;
    let full_text = extract::join_pages(&pages);
    Ok(chunk_text(&full_text, chunk_size))
}

fn make_chunk(index: usize, text: &str) -> Chunk {
    Chunk {
        id: chunk_id(index),
        index: index as i64,
        text: text.to_string(),
    }
}
