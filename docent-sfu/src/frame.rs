//! Reassembly of upstream frames into JSON documents
//!
//! The SFU does not promise one document per WebSocket message: a document
//! may be split over several messages and one message may carry several
//! documents back to back.
//!
//! Frames are scanned once, byte by byte, tracking object nesting and string
//! state; a document is handed to serde only when its closing brace arrives.
//! Bytes between documents that do not open an object are reported once per
//! run and skipped up to the next `{`.

use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct FrameAssembler {
    /// Document in progress, from its opening brace
    buffer: String,
    max_size: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Current document outgrew `max_size`; scanning on to its end unbuffered
    oversized: bool,
    /// Inside a run of stray bytes that was already reported
    in_garbage: bool,
}

impl FrameAssembler {
    #[must_use]
    pub const fn new(max_size: usize) -> Self {
        Self {
            buffer: String::new(),
            max_size,
            depth: 0,
            in_string: false,
            escaped: false,
            oversized: false,
            in_garbage: false,
        }
    }

    /// Bytes held back waiting for the rest of a document
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append a frame and drain every document it completes
    ///
    /// Malformed or oversized documents and stray bytes yield `Err` items;
    /// documents after them in the same frame are still returned.
    pub fn push(&mut self, fragment: &str) -> Vec<Result<Value>> {
        let mut documents = Vec::new();
        // Start, within this fragment, of the current document's bytes
        let mut start = 0;

        for (i, byte) in fragment.bytes().enumerate() {
            if self.depth == 0 {
                match byte {
                    b'{' => {
                        self.in_garbage = false;
                        self.depth = 1;
                        start = i;
                    }
                    b if b.is_ascii_whitespace() => {}
                    _ if self.in_garbage => {}
                    _ => {
                        self.in_garbage = true;
                        documents.push(Err(Error::Protocol(
                            "unexpected data between upstream documents".to_string(),
                        )));
                    }
                }
                continue;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(document) = self.finish(&fragment[start..=i]) {
                            documents.push(document);
                        }
                    }
                }
                _ => {}
            }
        }

        if self.depth > 0 {
            self.hold(&fragment[start..], &mut documents);
        }
        documents
    }

    /// Keep the unfinished tail of the current document
    fn hold(&mut self, tail: &str, documents: &mut Vec<Result<Value>>) {
        if self.oversized {
            return;
        }
        if self.buffer.len() + tail.len() > self.max_size {
            documents.push(Err(self.too_large()));
            self.oversized = true;
            self.buffer.clear();
            return;
        }
        self.buffer.push_str(tail);
    }

    /// Close the current document; `None` if it was already reported
    fn finish(&mut self, tail: &str) -> Option<Result<Value>> {
        if std::mem::take(&mut self.oversized) {
            return None;
        }
        if self.buffer.len() + tail.len() > self.max_size {
            self.buffer.clear();
            return Some(Err(self.too_large()));
        }

        self.buffer.push_str(tail);
        let parsed = serde_json::from_str::<Value>(&self.buffer)
            .map_err(|e| Error::Protocol(format!("malformed upstream JSON: {e}")));
        self.buffer.clear();
        Some(parsed)
    }

    fn too_large(&self) -> Error {
        Error::Protocol(format!("upstream document exceeds {} bytes", self.max_size))
    }
}
