//! Word-bounded passage aggregation over an HTML-like node tree.
//!
//! The text is parsed as an HTML fragment. A node whose visible text fits the
//! word bound becomes one passage; larger nodes are broken down into their
//! children, and adjacent child passages are merged back together while they
//! still fit.

use super::Passage;
use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;
use tracing::debug;

/// Tags whose text never reaches a passage.
pub const EXCLUDED_TAGS: &[&str] = &["script", "style", "noscript"];

/// Groups document text into passages of at most `max_words` words.
#[derive(Debug, Clone)]
pub struct PassageChunker {
    max_words: usize,
    greedy_siblings: bool,
    excluded_tags: HashSet<String>,
}

impl PassageChunker {
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
            greedy_siblings: true,
            excluded_tags: EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Toggle merging of adjacent sibling passages.
    pub fn with_greedy_siblings(mut self, greedy: bool) -> Self {
        self.greedy_siblings = greedy;
        self
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split text into ordered, non-overlapping passages.
    pub fn chunk(&self, text: &str) -> Vec<Passage> {
        let fragment = Html::parse_fragment(text);
        let passages: Vec<Passage> = self
            .passages_for(fragment.root_element())
            .into_iter()
            .map(|words| Passage::new(words.join(" "), words.len()))
            .collect();

        debug!("Aggregated {} passages", passages.len());
        passages
    }

    fn is_excluded(&self, element: ElementRef<'_>) -> bool {
        self.excluded_tags.contains(element.value().name())
    }

    fn passages_for<'a>(&self, element: ElementRef<'a>) -> Vec<Vec<&'a str>> {
        if self.is_excluded(element) {
            return Vec::new();
        }

        let mut words = Vec::new();
        self.collect_words(element, &mut words);

        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.max_words {
            return vec![words];
        }

        let mut child_passages = Vec::new();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let text: &'a str = text;
                    let words: Vec<&'a str> = text.split_whitespace().collect();
                    child_passages.extend(words.chunks(self.max_words).map(|w| w.to_vec()));
                }
                Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        child_passages.extend(self.passages_for(child_element));
                    }
                }
                _ => {}
            }
        }

        if self.greedy_siblings {
            self.merge_siblings(child_passages)
        } else {
            child_passages
        }
    }

    fn collect_words<'a>(&self, element: ElementRef<'a>, words: &mut Vec<&'a str>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let text: &'a str = text;
                    words.extend(text.split_whitespace());
                }
                Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        if !self.is_excluded(child_element) {
                            self.collect_words(child_element, words);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn merge_siblings<'a>(&self, passages: Vec<Vec<&'a str>>) -> Vec<Vec<&'a str>> {
        let mut merged: Vec<Vec<&'a str>> = Vec::with_capacity(passages.len());

        for passage in passages {
            match merged.last_mut() {
                Some(last) if last.len() + passage.len() <= self.max_words => {
                    last.extend(passage);
                }
                _ => merged.push(passage),
            }
        }

        merged
    }
}

impl Default for PassageChunker {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.text.as_str()).collect()
    }

    const PAGE: &str = "<div><p>one two</p><p>three four</p>\
        <script>var secret = 1;</script><style>.hidden { color: red }</style>\
        <noscript>enable javascript</noscript><p>five six</p></div>";

    #[test]
    fn test_small_document_is_single_passage() {
        let passages = PassageChunker::new(200).chunk(PAGE);
        assert_eq!(texts(&passages), vec!["one two three four five six"]);
        assert_eq!(passages[0].word_count, 6);
    }

    #[test]
    fn test_excluded_tags_never_appear() {
        for max_words in [1, 2, 3, 4, 200] {
            let passages = PassageChunker::new(max_words).chunk(PAGE);
            for passage in &passages {
                assert!(!passage.text.contains("secret"));
                assert!(!passage.text.contains("hidden"));
                assert!(!passage.text.contains("javascript"));
            }
        }
    }

    #[test]
    fn test_siblings_merge_greedily_up_to_bound() {
        let passages = PassageChunker::new(4).chunk(PAGE);
        assert_eq!(texts(&passages), vec!["one two three four", "five six"]);

        let passages = PassageChunker::new(3).chunk(PAGE);
        assert_eq!(texts(&passages), vec!["one two", "three four", "five six"]);
    }

    #[test]
    fn test_without_greedy_merging_each_sibling_stands_alone() {
        let passages = PassageChunker::new(4)
            .with_greedy_siblings(false)
            .chunk(PAGE);
        assert_eq!(texts(&passages), vec!["one two", "three four", "five six"]);
    }

    #[test]
    fn test_plain_text_is_windowed_by_word_bound() {
        let text: Vec<String> = (0..450).map(|i| format!("w{}", i)).collect();
        let passages = PassageChunker::new(200).chunk(&text.join(" "));

        let counts: Vec<usize> = passages.iter().map(|p| p.word_count).collect();
        assert_eq!(counts, vec![200, 200, 50]);
        assert!(passages[0].text.starts_with("w0 w1"));
        assert!(passages[2].text.ends_with("w449"));
    }

    #[test]
    fn test_passages_preserve_word_order() {
        let html = "<section><h1>Title here</h1><p>alpha beta gamma</p>\
                    <ul><li>delta</li><li>epsilon zeta</li></ul>trailing words</section>";
        let passages = PassageChunker::new(3).chunk(html);

        let rejoined: Vec<&str> = passages
            .iter()
            .flat_map(|p| p.text.split_whitespace())
            .collect();
        assert_eq!(
            rejoined,
            vec![
                "Title", "here", "alpha", "beta", "gamma", "delta", "epsilon", "zeta",
                "trailing", "words"
            ]
        );
        assert!(passages.iter().all(|p| p.word_count <= 3));
    }

    #[test]
    fn test_entities_are_decoded() {
        let passages = PassageChunker::new(10).chunk("Fish &amp; chips");
        assert_eq!(texts(&passages), vec!["Fish & chips"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(PassageChunker::new(10).chunk("  ").is_empty());
        assert!(PassageChunker::new(10).chunk("<script>x</script>").is_empty());
    }
}
