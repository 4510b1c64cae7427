//! Split template descriptions into embeddable facets.

use atg_templates::Template;

/// One embeddable piece of a template description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Chunk a template's description.
///
/// Each paragraph is a facet; facets longer than `max_chars` are split at
/// sentence boundaries. Chunk 0 is prefixed with the resource kind's
/// display name so every template has at least one chunk naming its kind.
pub fn chunk_template(template: &Template, max_chars: usize) -> Vec<Chunk> {
    let mut texts: Vec<String> = Vec::new();
    for facet in template.facets() {
        texts.extend(split_sentences(facet, max_chars));
    }

    let title = template.resource_kind.display_name();
    match texts.first_mut() {
        Some(first) => *first = format!("{title}. {first}"),
        None => texts.push(title.to_string()),
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Greedily pack whole sentences into pieces of at most `max_chars`.
///
/// A single sentence longer than the limit becomes its own piece.
fn split_sentences(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for sentence in sentences(text) {
        let needed = if current.is_empty() {
            sentence.chars().count()
        } else {
            current.chars().count() + 1 + sentence.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let at_end = i + 1 == bytes.len();
        let is_break = matches!(b, b'.' | b'!' | b'?')
            && (at_end || bytes[i + 1].is_ascii_whitespace());
        if is_break {
            let sentence = text[start..=i].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
