//! Incremental walk of a [`TokenTrie`] from one start position.

use super::TokenTrie;

/// A token recognized by an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalLocation {
    /// Registration index of the token
    pub index: usize,
    /// Bytes matched
    pub length: usize,
    /// Inclusive trim offsets of the token
    pub start: usize,
    pub end: usize,
}

/// Feeds bytes one at a time and remembers the longest token seen so far.
///
/// The walk is anchored at the first accepted byte. Once no registered token
/// can extend the bytes seen, [`accept`](Self::accept) returns `false` and
/// further input is ignored.
#[derive(Debug, Clone)]
pub struct TokenTrieEvaluator<'a> {
    trie: &'a TokenTrie,
    node: Option<usize>,
    consumed: usize,
    best: Option<TerminalLocation>,
}

impl<'a> TokenTrieEvaluator<'a> {
    pub fn new(trie: &'a TokenTrie) -> Self {
        Self {
            trie,
            node: Some(trie.root()),
            consumed: 0,
            best: None,
        }
    }

    /// Advances by `byte`. Returns whether a longer token is still possible.
    pub fn accept(&mut self, byte: u8) -> bool {
        let Some(current) = self.node else {
            return false;
        };

        let next = self.trie.node(current).children.get(&byte).copied();
        self.node = next;
        let Some(next) = next else {
            return false;
        };

        self.consumed += 1;
        let node = self.trie.node(next);
        if let Some(terminal) = node.terminal {
            self.best = Some(TerminalLocation {
                index: terminal.index,
                length: terminal.length,
                start: terminal.start,
                end: terminal.end,
            });
        }
        !node.children.is_empty()
    }

    /// Bytes accepted along the trie so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Longest token recognized so far.
    pub fn best(&self) -> Option<TerminalLocation> {
        self.best
    }

    /// Ends the walk, returning the longest token recognized.
    pub fn finish(self) -> Option<TerminalLocation> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use crate::trie::{Token, TokenTrie};

    #[test]
    fn test_reports_longest_so_far() {
        let mut trie = TokenTrie::new();
        trie.add_token(Token::literal(b"<".to_vec()));
        let comment = trie.add_token(Token::literal(b"<!--".to_vec()));

        let mut evaluator = trie.evaluator();
        assert!(evaluator.accept(b'<'));
        assert_eq!(evaluator.best().map(|t| t.index), Some(0));
        assert!(evaluator.accept(b'!'));
        assert!(evaluator.accept(b'-'));
        assert!(!evaluator.accept(b'-'));
        assert_eq!(evaluator.consumed(), 4);

        let found = evaluator.finish().unwrap();
        assert_eq!(found.index, comment);
        assert_eq!(found.length, 4);
    }

    #[test]
    fn test_dead_end_ignores_further_input() {
        let mut trie = TokenTrie::new();
        trie.add_token(Token::literal(b"ab".to_vec()));

        let mut evaluator = trie.evaluator();
        assert!(!evaluator.accept(b'x'));
        assert!(!evaluator.accept(b'a'));
        assert_eq!(evaluator.consumed(), 0);
        assert!(evaluator.finish().is_none());
    }
}
