//! Sparse TF-IDF index over character n-grams.
//!
//! Each document is split into words, every word is padded with a space on
//! both sides and cut into n-grams of length 1 to 3. Term weights are raw
//! counts times a smoothed inverse document frequency, and every vector is
//! L2-normalized so a dot product is the cosine similarity.
//!
//! The index is a recall pre-filter: it decides which candidates get scored
//! in detail, never which one wins.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

const MIN_GRAM: usize = 1;
const MAX_GRAM: usize = 3;

/// A document retrieved for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Insertion position of the document.
    pub position: usize,
    /// Cosine similarity in `(0, 1]`.
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    terms: HashMap<String, usize>,
    idf: Vec<f64>,
    /// Per term: `(document, weight)` in document order.
    postings: Vec<Vec<(usize, f64)>>,
    documents: usize,
}

impl CandidateIndex {
    pub fn build<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut terms: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<BTreeMap<usize, usize>> = Vec::new();

        for document in documents {
            let mut doc_counts = BTreeMap::new();
            for gram in char_ngrams(document) {
                let next_id = terms.len();
                let term = *terms.entry(gram).or_insert(next_id);
                *doc_counts.entry(term).or_insert(0) += 1;
            }
            counts.push(doc_counts);
        }

        let documents = counts.len();
        let mut document_frequency = vec![0usize; terms.len()];
        for doc_counts in &counts {
            for term in doc_counts.keys() {
                document_frequency[*term] += 1;
            }
        }
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|df| smooth_idf(documents, *df))
            .collect();

        let mut postings = vec![Vec::new(); terms.len()];
        for (position, doc_counts) in counts.iter().enumerate() {
            for (term, weight) in weigh(doc_counts, &idf) {
                postings[term].push((position, weight));
            }
        }

        tracing::debug!(documents, terms = terms.len(), "built candidate index");
        Self {
            terms,
            idf,
            postings,
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    /// The `k` most similar documents with a positive score.
    ///
    /// Ties are broken by insertion order. An empty index, an empty query or
    /// `k == 0` yields no hits.
    pub fn query(&self, text: &str, k: usize) -> Vec<IndexHit> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut query_counts = BTreeMap::new();
        for gram in char_ngrams(text) {
            if let Some(term) = self.terms.get(&gram) {
                *query_counts.entry(*term).or_insert(0usize) += 1;
            }
        }
        if query_counts.is_empty() {
            return Vec::new();
        }

        // Only documents sharing a term with the query get an accumulator.
        let mut scores: HashMap<usize, f64> = HashMap::new();
        for (term, query_weight) in weigh(&query_counts, &self.idf) {
            for (position, weight) in &self.postings[term] {
                *scores.entry(*position).or_insert(0.0) += query_weight * weight;
            }
        }

        let mut hits: Vec<IndexHit> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(position, score)| IndexHit { position, score })
            .collect();
        if hits.len() > k {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_by(rank);
        hits
    }
}

/// Best score first, then insertion order.
fn rank(a: &IndexHit, b: &IndexHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}

/// `ln((1 + n) / (1 + df)) + 1`: never zero, so terms present in every
/// document still count.
fn smooth_idf(documents: usize, df: usize) -> f64 {
    ((1.0 + documents as f64) / (1.0 + df as f64)).ln() + 1.0
}

/// TF-IDF weights of one document, L2-normalized, in term order.
fn weigh(counts: &BTreeMap<usize, usize>, idf: &[f64]) -> Vec<(usize, f64)> {
    let raw: Vec<(usize, f64)> = counts
        .iter()
        .map(|(term, count)| (*term, *count as f64 * idf[*term]))
        .collect();
    let norm = raw.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return Vec::new();
    }
    raw.into_iter().map(|(term, w)| (term, w / norm)).collect()
}

/// Word-bounded character n-grams.
fn char_ngrams(text: &str) -> Vec<String> {
    let mut grams = Vec::new();
    for word in text.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for n in MIN_GRAM..=MAX_GRAM {
            grams.extend(padded.windows(n).map(|window| window.iter().collect::<String>()));
        }
    }
    grams
}
