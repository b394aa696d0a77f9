//! Token recognition over byte buffers.
//!
//! A [`TokenTrie`] holds byte-string tokens registered up front. Nodes live in
//! one arena and refer to each other by position, so a trie is a single
//! allocation that can be cloned and appended cheaply.
//!
//! ```
//! use scaffold_cli::trie::{Token, TokenTrie};
//!
//! let mut trie = TokenTrie::new();
//! trie.add_token(Token::literal(b"ab"));
//! let abc = trie.add_token(Token::literal(b"abc"));
//!
//! let mut cursor = 0;
//! assert_eq!(trie.get_operation(b"abcd", 4, &mut cursor), Some(abc));
//! assert_eq!(cursor, 3);
//! ```

mod evaluator;

pub use evaluator::{TerminalLocation, TokenTrieEvaluator};

use std::collections::BTreeMap;

/// A byte pattern with inclusive trim offsets.
///
/// After a match the cursor moves to `end + 1` bytes past the match start, so
/// a token can consume less (or more, up to its own length) than it matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    value: Vec<u8>,
    start: usize,
    end: usize,
}

impl Token {
    /// A token consuming exactly what it matches.
    pub fn literal(value: impl Into<Vec<u8>>) -> Self {
        let value = value.into();
        let end = value.len().saturating_sub(1);
        Self {
            value,
            start: 0,
            end,
        }
    }

    /// A token with trim offsets, clamped into the pattern.
    pub fn new(value: impl Into<Vec<u8>>, start: usize, end: usize) -> Self {
        let value = value.into();
        let end = end.min(value.len().saturating_sub(1));
        Self {
            value,
            start: start.min(end),
            end,
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Terminal {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub children: BTreeMap<u8, usize>,
    pub terminal: Option<Terminal>,
}

const ROOT: usize = 0;

/// Registered tokens and the prefix tree over their patterns.
#[derive(Debug, Clone)]
pub struct TokenTrie {
    nodes: Vec<Node>,
    tokens: Vec<Token>,
    lengths: Vec<usize>,
    min_length: usize,
    max_length: usize,
}

impl Default for TokenTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            tokens: Vec::new(),
            lengths: Vec::new(),
            min_length: usize::MAX,
            max_length: 0,
        }
    }

    /// Registers `token` under the next free index and returns it.
    pub fn add_token(&mut self, token: Token) -> usize {
        let index = self.tokens.len();
        self.add_token_with_index(token, index);
        index
    }

    /// Registers `token` under a caller-chosen index.
    ///
    /// A pattern registered twice reports the later index.
    pub fn add_token_with_index(&mut self, token: Token, index: usize) {
        let mut node = ROOT;
        for &byte in token.value() {
            node = match self.nodes[node].children.get(&byte) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children.insert(byte, child);
                    child
                }
            };
        }

        let length = token.len();
        if node != ROOT {
            self.nodes[node].terminal = Some(Terminal {
                index,
                start: token.start(),
                end: token.end(),
                length,
            });
        }

        self.min_length = self.min_length.min(length);
        self.max_length = self.max_length.max(length);
        self.lengths.push(length);
        self.tokens.push(token);
    }

    /// Re-registers every token of `other` under fresh indices.
    pub fn append(&mut self, other: &TokenTrie) {
        for token in &other.tokens {
            self.add_token(token.clone());
        }
    }

    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    /// Shortest registered pattern, 0 for an empty trie.
    pub fn min_length(&self) -> usize {
        if self.tokens.is_empty() { 0 } else { self.min_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn token_lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn evaluator(&self) -> TokenTrieEvaluator<'_> {
        TokenTrieEvaluator::new(self)
    }

    pub(crate) fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn root(&self) -> usize {
        ROOT
    }

    /// Matches the longest token starting exactly at `cursor`.
    ///
    /// Only the first `length` bytes of `buffer` are considered. On a match the
    /// cursor moves past it, honoring the token's trim offsets, and the
    /// registration index is returned. Otherwise the cursor is left alone.
    pub fn get_operation(&self, buffer: &[u8], length: usize, cursor: &mut usize) -> Option<usize> {
        let length = length.min(buffer.len());
        let origin = *cursor;
        if origin >= length || length - origin < self.min_length() {
            return None;
        }

        let window = &buffer[origin..length.min(origin.saturating_add(self.max_length))];
        let mut evaluator = self.evaluator();
        for &byte in window {
            if !evaluator.accept(byte) {
                break;
            }
        }

        let location = evaluator.finish()?;
        *cursor = origin + location.end + 1;
        Some(location.index)
    }
}
