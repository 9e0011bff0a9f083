//! Delivery of reports and notices to the operator.

use std::io::{self, Write};

/// Largest chunk a single delivery may carry.
pub const DEFAULT_CHUNK_LIMIT: usize = 1950;

pub trait Emitter {
    fn emit(&mut self, text: &str);
}

/// Split `text` into chunks of at most `limit` characters, breaking between lines.
///
/// A single line longer than `limit` is the only thing ever split mid-line.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let needed = if current.is_empty() {
            line.chars().count()
        } else {
            current.chars().count() + 1 + line.chars().count()
        };

        if needed > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if line.chars().count() > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Writes each chunk to stdout.
pub struct StdoutEmitter {
    chunk_limit: usize,
}

impl StdoutEmitter {
    pub fn new(chunk_limit: usize) -> Self {
        Self { chunk_limit }
    }
}

impl Default for StdoutEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_LIMIT)
    }
}

impl Emitter for StdoutEmitter {
    fn emit(&mut self, text: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for chunk in chunk_message(text, self.chunk_limit) {
            if let Err(e) = writeln!(handle, "{}\n", chunk) {
                log::warn!("Failed to write report: {}", e);
                return;
            }
        }
        let _ = handle.flush();
    }
}

/// Keeps every chunk in memory.
#[derive(Debug, Default)]
pub struct BufferEmitter {
    pub chunk_limit: Option<usize>,
    pub messages: Vec<String>,
}

impl BufferEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Emitter for BufferEmitter {
    fn emit(&mut self, text: &str) {
        match self.chunk_limit {
            Some(limit) => self.messages.extend(chunk_message(text, limit)),
            None => self.messages.push(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_message("a\nb", 1950), vec!["a\nb".to_string()]);
        assert!(chunk_message("", 10).is_empty());
    }

    #[test]
    fn test_chunks_break_between_lines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = chunk_message(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 9));
    }

    #[test]
    fn test_oversized_line_is_split() {
        let chunks = chunk_message("ab\ncdefghij\nk", 4);
        assert_eq!(chunks, vec!["ab", "cdef", "ghij", "k"]);
    }

    #[test]
    fn test_buffer_emitter_chunks_when_limited() {
        let mut emitter = BufferEmitter {
            chunk_limit: Some(4),
            messages: Vec::new(),
        };
        emitter.emit("abc\ndef");
        assert_eq!(emitter.messages, vec!["abc", "def"]);
    }
}
