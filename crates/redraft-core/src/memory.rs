//! Small conversational memory helpers.
//!
//! A sliding window retains the last `k` snippets of context;
//! [`EntitiesMemory`] collects capitalized tokens, which often
//! correspond to named entities. The two compose by concatenating
//! their `context()` outputs.

use std::collections::{BTreeSet, VecDeque};

use regex::Regex;

/// Fixed-size window of recent text snippets.
pub struct SlidingMemory {
    capacity: usize,
    buf: VecDeque<String>,
}

impl SlidingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buf: VecDeque::new(),
        }
    }

    pub fn add(&mut self, text: impl Into<String>) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(text.into());
    }

    /// Concatenated context from all stored snippets, oldest first.
    pub fn context(&self) -> String {
        self.buf.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

impl Default for SlidingMemory {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Naive named-entity collector.
pub struct EntitiesMemory {
    pattern: Regex,
    entities: BTreeSet<String>,
}

impl EntitiesMemory {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\b([A-Z][a-zA-Z]{2,})\b").expect("valid entity pattern"),
            entities: BTreeSet::new(),
        }
    }

    /// Extract capitalized words and remember them as entities.
    pub fn ingest(&mut self, text: &str) {
        for capture in self.pattern.captures_iter(text) {
            self.entities.insert(capture[1].to_string());
        }
    }

    /// Formatted line of known entities, empty when none are known.
    pub fn context(&self) -> String {
        if self.entities.is_empty() {
            return String::new();
        }
        let names: Vec<&str> = self.entities.iter().map(|s| s.as_str()).collect();
        format!("Known entities: {}", names.join(", "))
    }
}

impl Default for EntitiesMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sliding_window_evicts_oldest() {
        let mut mem = SlidingMemory::new(2);
        mem.add("one");
        mem.add("two");
        mem.add("three");
        assert_eq!(mem.context(), "two\nthree");
    }

    #[test]
    fn test_entities_sorted_and_deduped() {
        let mut mem = EntitiesMemory::new();
        mem.ingest("Patient Zoe saw Dr Anders at the Mayo clinic. Anders agreed.");
        assert_eq!(mem.context(), "Known entities: Anders, Mayo, Patient, Zoe");
    }

    #[test]
    fn test_entities_skip_short_tokens() {
        let mut mem = EntitiesMemory::new();
        mem.ingest("AI is used by Dr Li");
        assert_eq!(mem.context(), "");
    }

    #[test]
    fn test_contexts_compose() {
        let mut window = SlidingMemory::default();
        window.add("visit notes");
        let mut entities = EntitiesMemory::new();
        entities.ingest("Seen at Fairview");
        let combined = format!("{}\n{}", window.context(), entities.context());
        assert_eq!(combined, "visit notes\nKnown entities: Fairview");
    }
}
