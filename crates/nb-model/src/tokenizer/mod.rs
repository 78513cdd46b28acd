pub mod vocab;

/// Split a corpus into tokens on Unicode whitespace.
///
/// Runs of whitespace never produce empty tokens; no other normalization is
/// applied, so `"Dog"` and `"dog"` stay distinct.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
