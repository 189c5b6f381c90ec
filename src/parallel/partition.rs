use crate::error::PipelineError;

/// Contiguous slice of the payload tagged with its position.
///
/// `order_key` is assigned once, in increasing offset order, and is the only
/// thing reassembly sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub order_key: usize,
    /// Offset of the first character, counted in characters.
    pub offset: usize,
    pub text: &'a str,
}

/// Split `payload` into at most `n` chunks of `ceil(chars / n)` characters.
///
/// Boundaries always fall between characters. `n` is clamped to the character
/// count so no chunk is empty; an empty payload yields no chunks.
pub fn split(payload: &str, n: usize) -> Result<Vec<Chunk<'_>>, PipelineError> {
    if n == 0 {
        return Err(PipelineError::Partition(
            "at least one chunk must be requested".to_string(),
        ));
    }

    let char_count = payload.chars().count();
    if char_count == 0 {
        return Ok(Vec::new());
    }

    let n = n.min(char_count);
    let chunk_chars = char_count.div_ceil(n);

    // Byte positions of every chunk start, plus the end of the payload.
    let mut bounds: Vec<usize> = payload
        .char_indices()
        .step_by(chunk_chars)
        .map(|(byte, _)| byte)
        .collect();
    bounds.push(payload.len());

    let chunks = bounds
        .windows(2)
        .enumerate()
        .map(|(order_key, w)| Chunk {
            order_key,
            offset: order_key * chunk_chars,
            text: &payload[w[0]..w[1]],
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(chunks: &[Chunk<'a>]) -> Vec<&'a str> {
        chunks.iter().map(|c| c.text).collect()
    }

    #[test]
    fn test_ceil_sized_chunks() {
        let chunks = split("Attack at Dawn", 3).unwrap();
        assert_eq!(texts(&chunks), vec!["Attac", "k at ", "Dawn"]);
        assert_eq!(
            chunks.iter().map(|c| c.offset).collect::<Vec<_>>(),
            vec![0, 5, 10]
        );
        assert_eq!(
            chunks.iter().map(|c| c.order_key).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_concatenation_reproduces_payload() {
        let payload = "the cat and the cat and the cat";
        for n in 1..=payload.len() {
            let chunks = split(payload, n).unwrap();
            assert!(chunks.len() <= n);
            assert!(chunks.iter().all(|c| !c.text.is_empty()));
            assert_eq!(texts(&chunks).concat(), payload, "n = {n}");
        }
    }

    #[test]
    fn test_clamps_to_character_count() {
        let chunks = split("abc", 10).unwrap();
        assert_eq!(texts(&chunks), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let payload = "ÄÖÜ日本語🦀x";
        for n in 1..=8 {
            let chunks = split(payload, n).unwrap();
            assert_eq!(texts(&chunks).concat(), payload);
        }
        let chunks = split(payload, 4).unwrap();
        assert_eq!(texts(&chunks), vec!["ÄÖ", "Ü日", "本語", "🦀x"]);
    }

    #[test]
    fn test_empty_payload() {
        assert!(split("", 4).unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunks_rejected() {
        assert!(matches!(split("abc", 0), Err(PipelineError::Partition(_))));
    }
}
