//! Recursive character text splitter.
//!
//! Splits on the coarsest separator present (`"\n\n"`, then `"\n"`, then
//! `" "`, then between characters), recursing into pieces that are still
//! too long, and merges small pieces back into windows of at most
//! `chunk_size` characters. Neighbouring windows share up to
//! `chunk_overlap` characters of trailing context.
//!
//! Separators stay attached to the piece that follows them, so a merged
//! chunk reproduces the source text exactly apart from trimming.

use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl RecursiveCharacterSplitter {
    /// Sizes are in characters. `chunk_size` is at least 1 and the overlap
    /// is clamped below it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_recursive(text, &DEFAULT_SEPARATORS, &mut chunks);
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let (separator, finer) = pick_separator(text, separators);
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                out.extend(self.merge(&small));
                small.clear();
            }

            if finer.is_empty() {
                out.push(piece.to_string());
            } else {
                self.split_recursive(piece, finer, out);
            }
        }

        if !small.is_empty() {
            out.extend(self.merge(&small));
        }
    }

    /// Greedily pack pieces into windows, carrying the tail of each
    /// window (at most `chunk_overlap` chars) into the next.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut docs, &window);

                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&mut docs, &window);
        docs
    }
}

/// The first separator occurring in `text`, and the finer separators after it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split before every occurrence of `separator`, dropping empty pieces.
/// An empty separator splits between characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        let boundary = if separator.is_empty() {
            true
        } else {
            text[i..].starts_with(separator)
        };
        if boundary && i > start {
            pieces.push(&text[start..i]);
            start = i;
        }
        if separator.is_empty() {
            // each char is its own piece
            let end = i + c.len_utf8();
            pieces.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_joined(docs: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
