// --- File: src/core/trie.rs
use std::collections::{HashMap, HashSet, VecDeque};

/// Index into the pattern table of a [`PatternTrie`].
pub type PatternId = usize;

const ROOT: usize = 0;

#[derive(Clone, Debug)]
struct TrieNode {
    children: HashMap<u8, usize>,
    /// Longest proper suffix of this node's path that is also a trie path.
    fail: usize,
    /// Patterns ending here, including those inherited through the fail chain.
    outputs: Vec<PatternId>,
}

impl TrieNode {
    fn new() -> Self {
        Self { children: HashMap::new(), fail: ROOT, outputs: Vec::new() }
    }
}

/// A byte-level Aho-Corasick automaton.
///
/// Patterns are inserted into a plain trie first; [`PatternTrie::build`] then
/// wires the failure links so a single pass over a text reports every pattern
/// that occurs in it as a literal substring. Working on UTF-8 bytes keeps the
/// result identical to `str::contains` for every pattern.
#[derive(Clone, Debug)]
pub struct PatternTrie {
    nodes: Vec<TrieNode>,
    pattern_count: usize,
    built: bool,
}

impl Default for PatternTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTrie {
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::new()], pattern_count: 0, built: false }
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Inserts a pattern and returns its id. Empty patterns are rejected since
    /// they would match every text.
    /// O(k) complexity where k is the pattern length in bytes.
    pub fn insert(&mut self, pattern: &str) -> Option<PatternId> {
        if pattern.is_empty() {
            return None;
        }
        let mut node_idx = ROOT;
        for &byte in pattern.as_bytes() {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(&byte) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(TrieNode::new());
                self.nodes[node_idx].children.insert(byte, new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }
        let id = self.pattern_count;
        self.pattern_count += 1;
        self.nodes[node_idx].outputs.push(id);
        self.built = false;
        Some(id)
    }

    /// Computes failure links breadth-first. Every node's fail target is
    /// shallower than the node itself, so it is final by the time we get there.
    pub fn build(&mut self) {
        let mut queue = VecDeque::new();
        let root_children: Vec<usize> = self.nodes[ROOT].children.values().copied().collect();
        for child in root_children {
            self.nodes[child].fail = ROOT;
            queue.push_back(child);
        }

        while let Some(idx) = queue.pop_front() {
            let edges: Vec<(u8, usize)> =
                self.nodes[idx].children.iter().map(|(&b, &c)| (b, c)).collect();
            for (byte, child) in edges {
                let fail = self.step(self.nodes[idx].fail, byte);
                self.nodes[child].fail = fail;
                let inherited = self.nodes[fail].outputs.clone();
                self.nodes[child].outputs.extend(inherited);
                queue.push_back(child);
            }
        }
        self.built = true;
    }

    fn step(&self, mut state: usize, byte: u8) -> usize {
        loop {
            if let Some(&next) = self.nodes[state].children.get(&byte) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.nodes[state].fail;
        }
    }

    /// Returns the ids of all patterns occurring anywhere in `text`.
    /// O(n + m) where n is the text length and m the number of matches.
    pub fn find_all(&self, text: &str) -> HashSet<PatternId> {
        debug_assert!(self.built || self.pattern_count == 0, "find_all before build");
        let mut found = HashSet::new();
        let mut state = ROOT;
        for &byte in text.as_bytes() {
            state = self.step(state, byte);
            found.extend(self.nodes[state].outputs.iter().copied());
        }
        found
    }
}
