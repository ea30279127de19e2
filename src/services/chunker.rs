//! Overlapping sliding-window text splitting.

use crate::error::ConfigError;
use crate::models::ChunkingConfig;

/// Split raw text into overlapping fixed-size windows.
///
/// Each window spans `[start, min(start + chunk_size, len))` in characters,
/// is trimmed, and is kept only when non-empty; `start` then advances by
/// `chunk_size - overlap`. The final window may be shorter than `chunk_size`.
/// Together the windows cover every character of the input at least once.
///
/// `overlap` must stay below `chunk_size`; equal or larger values would pin
/// the window start in place and never terminate.
pub fn chunk_document(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::InvalidChunking(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ConfigError::InvalidChunking(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    // Character indexing, not bytes: legal documents routinely carry
    // section signs, accented names, and smart quotes.
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let step = chunk_size - overlap;

    let mut windows = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + chunk_size).min(total);
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            windows.push(trimmed.to_string());
        }
        start += step;
    }

    Ok(windows)
}

/// Convenience wrapper taking the chunking section of the config.
pub fn chunk_with_config(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ConfigError> {
    chunk_document(text, config.chunk_size, config.overlap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_document("", 2000, 200).unwrap().is_empty());
        assert!(chunk_document("   \n\t  ", 2000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert!(chunk_document("text", 100, 100).is_err());
        assert!(chunk_document("text", 100, 150).is_err());
        assert!(chunk_document("text", 0, 0).is_err());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_document("This clause survives termination.", 2000, 200).unwrap();
        assert_eq!(chunks, vec!["This clause survives termination."]);
    }

    #[test]
    fn test_five_thousand_chars_three_windows() {
        // Windows: [0, 2000), [1800, 3800), [3600, 5000)
        let text = "a".repeat(5000);
        let chunks = chunk_document(&text, 2000, 200).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 2000);
        assert_eq!(chunks[1].len(), 2000);
        assert_eq!(chunks[2].len(), 1400);
    }

    #[test]
    fn test_final_window_shorter_without_padding() {
        let text = "b".repeat(2500);
        let chunks = chunk_document(&text, 1000, 100).unwrap();
        // starts at 0, 900, 1800 -> last window [1800, 2500)
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.last().unwrap().len(), 700);
    }

    #[test]
    fn test_windows_cover_every_index() {
        let text: String = ('a'..='z').cycle().take(4321).collect();
        for (chunk_size, overlap) in [(500, 50), (1000, 0), (300, 299)] {
            let mut covered = vec![false; text.len()];
            let mut start = 0;
            while start < text.len() {
                let end = (start + chunk_size).min(text.len());
                covered[start..end].iter_mut().for_each(|c| *c = true);
                start += chunk_size - overlap;
            }
            assert!(covered.iter().all(|c| *c), "gap with config {chunk_size}/{overlap}");

            // Every produced window must also appear in the source text.
            let chunks = chunk_document(&text, chunk_size, overlap).unwrap();
            for chunk in &chunks {
                assert!(text.contains(chunk.as_str()));
            }
        }
    }

    #[test]
    fn test_whitespace_only_windows_are_dropped() {
        let mut text = "x".repeat(80);
        text.push_str(&" ".repeat(80));
        let chunks = chunk_document(&text, 100, 10).unwrap();
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "§ 1983 – la responsabilité civile ".repeat(100);
        let chunks = chunk_document(&text, 200, 20).unwrap();
        assert!(!chunks.is_empty());
    }
}
