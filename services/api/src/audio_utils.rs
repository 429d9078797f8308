use base64::Engine;

/// Encodes an audio payload for transport inside a JSON message.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Guesses the mime type of an audio payload from its leading bytes.
/// Falls back to `audio/mpeg`, which is what the TTS vendor is asked for.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wav",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        _ => "audio/mpeg",
    }
}

/// Splits text into sentence-sized chunks for engines that stall on long
/// utterances. Trailing text without terminal punctuation is its own chunk.
pub fn sentence_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && !matches!(chars.peek(), Some('.' | '!' | '?')) {
            let chunk = current.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
