/// Split `text` into overlapping chunks of roughly `target_size` characters.
///
/// Text no longer than `target_size` comes back verbatim as a single chunk. Longer
/// text is split on whitespace and tokens are accumulated (each costing its length
/// plus one separator) until the running length reaches `target_size`. The next
/// chunk starts with the trailing `overlap` tokens of the one just emitted, capped
/// at one token fewer than that chunk so accumulation always moves forward. Whatever
/// is left at the end, even if only the carried seed, becomes the final chunk.
pub fn chunk(text: &str, target_size: usize, overlap: usize) -> Vec<String> {
    if text.chars().count() <= target_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        current.push(word);
        current_len += word.chars().count() + 1;

        if current_len >= target_size {
            chunks.push(current.join(" "));

            let keep = overlap.min(current.len() - 1);
            current.drain(..current.len() - keep);
            current_len = current.iter().map(|w| w.chars().count() + 1).sum();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
