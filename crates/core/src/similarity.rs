//! Ratcliff/Obershelp similarity over character sequences.
//!
//! The ratio is `2M/T` over matching blocks found by recursive longest-match
//! search. Like `difflib.SequenceMatcher` without a junk predicate, sequences
//! of 200 or more characters ignore "popular" characters (more than 1% of the
//! sequence plus one) when seeding matches.

use crate::normalize::normalize_for_similarity;
use std::collections::{HashMap, HashSet};

/// Sequences at least this long are subject to the popularity heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A maximal matching run: `a[a_start..a_start+len] == b[b_start..b_start+len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

/// Finds matching blocks between two character sequences.
#[derive(Debug)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// Positions of each element of `b`, ascending. Popular elements are absent.
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let b2j = index_sequence(&b);
        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Ties resolve to the earliest start in `a`, then in `b`.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let mut best_i = alo;
        let mut best_j = blo;
        let mut best_size = 0;

        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    } + 1;
                    new_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular elements were never indexed; grow the match over equal
        // neighbours so they still count.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        Match {
            a_start: best_i,
            b_start: best_j,
            len: best_size,
        }
    }

    /// All non-overlapping matching blocks, ordered by position.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.len == 0 {
                continue;
            }
            if alo < m.a_start && blo < m.b_start {
                queue.push((alo, m.a_start, blo, m.b_start));
            }
            if m.a_start + m.len < ahi && m.b_start + m.len < bhi {
                queue.push((m.a_start + m.len, ahi, m.b_start + m.len, bhi));
            }
            blocks.push(m);
        }

        blocks.sort_by_key(|m| (m.a_start, m.b_start));
        blocks
    }

    /// Similarity in `[0, 1]`: twice the matched length over the total length.
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|m| m.len).sum();
        2.0 * matches as f64 / total as f64
    }
}

fn index_sequence(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    if b.len() >= AUTOJUNK_MIN_LEN {
        let threshold = b.len() / 100 + 1;
        let popular: HashSet<char> = b2j
            .iter()
            .filter(|(_, positions)| positions.len() > threshold)
            .map(|(&c, _)| c)
            .collect();
        for c in popular {
            b2j.remove(&c);
        }
    }

    b2j
}

/// Similarity between a source paragraph and its back-translation.
///
/// Both sides are normalized first. Two empty strings are identical (1.0).
pub fn similarity_score(a: &str, b: &str) -> f64 {
    let a = normalize_for_similarity(a);
    let b = normalize_for_similarity(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    SequenceMatcher::new(&a, &b).ratio()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_known_values() {
        assert!(approx(SequenceMatcher::new("abcd", "bcde").ratio(), 0.75));
        assert!(approx(
            SequenceMatcher::new("kitten", "sitting").ratio(),
            8.0 / 13.0
        ));
        assert!(approx(SequenceMatcher::new("abc", "xyz").ratio(), 0.0));
        assert!(approx(SequenceMatcher::new("", "").ratio(), 1.0));
        assert!(approx(SequenceMatcher::new("abc", "").ratio(), 0.0));
    }

    #[test]
    fn test_find_longest_match_prefers_earliest() {
        let m = SequenceMatcher::new(" abcd", "abcd abcd");
        let found = m.find_longest_match(0, 5, 0, 9);
        assert_eq!(
            found,
            Match {
                a_start: 0,
                b_start: 4,
                len: 5
            }
        );
    }

    #[test]
    fn test_matching_blocks() {
        let m = SequenceMatcher::new("abxcd", "abcd");
        let blocks = m.matching_blocks();
        assert_eq!(
            blocks,
            vec![
                Match {
                    a_start: 0,
                    b_start: 0,
                    len: 2
                },
                Match {
                    a_start: 3,
                    b_start: 2,
                    len: 2
                },
            ]
        );
    }

    #[test]
    fn test_autojunk_keeps_identical_long_text_at_one() {
        let text = "the quick brown fox jumps over the lazy dog. ".repeat(6);
        assert!(text.chars().count() >= AUTOJUNK_MIN_LEN);
        assert!(approx(SequenceMatcher::new(&text, &text).ratio(), 1.0));
    }

    #[test]
    fn test_autojunk_drops_popular_characters() {
        let a = format!("aaa{}", "b".repeat(200));
        let b = format!("{}aaa", "b".repeat(200));
        let sm = SequenceMatcher::new(&a, &b);

        // 'b' is popular in the second sequence, so only "aaa" can seed a match.
        assert_eq!(
            sm.matching_blocks(),
            vec![Match {
                a_start: 0,
                b_start: 200,
                len: 3
            }]
        );
        assert!(approx(sm.ratio(), 6.0 / 406.0));
        assert!(approx(sm.ratio(), 0.014778325123152709));
    }

    #[test]
    fn test_similarity_score_normalizes() {
        assert!(approx(similarity_score("  Hello World ", "hello   world"), 1.0));
        assert!(approx(similarity_score("", "   "), 1.0));
        assert!(approx(similarity_score("Hello", ""), 0.0));
    }

    #[test]
    fn test_similarity_score_bounds() {
        let pairs = [
            ("Welcome to the quarterly review", "Welcome to quarterly review"),
            ("Revenue grew", "Sales increased"),
            ("Agenda", "agenda"),
        ];
        for (a, b) in pairs {
            let s = similarity_score(a, b);
            assert!((0.0..=1.0).contains(&s), "{} out of range", s);
        }
        assert!(similarity_score(pairs[0].0, pairs[0].1) > 0.9);
        assert!(similarity_score(pairs[1].0, pairs[1].1) < 0.7);
    }
}
