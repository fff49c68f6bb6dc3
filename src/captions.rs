//! Captions: the offline template pool, line splitting for API text, and the
//! tab-separated mapping file written next to each set of creatives.

use std::path::Path;
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;

use crate::constants::CAPTIONS_FILENAME;

static SENTENCE_BREAK: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[.!?;]+"));

const BULLET_CHARS: &[char] = &[' ', '-', '*', '•', '\t', '\r', '\n'];

/// The fixed caption templates for a brand/product pair.
pub fn caption_templates(brand: &str, product: &str) -> [String; 5] {
    [
        format!("{brand} {product} — style meets performance."),
        format!("Upgrade your day with the {product} from {brand}."),
        format!("Feel the difference with {brand}'s {product}. Shop now!"),
        format!("The {product} by {brand} — crafted for comfort and quality."),
        format!("Special offer: grab the {product} by {brand} today."),
    ]
}

/// Deterministic captions: the template pool cycled from the first entry.
pub fn fallback_captions(brand: &str, product: &str, n: usize) -> Vec<String> {
    fallback_captions_from(brand, product, 0, n)
}

/// Continues the template cycle at `start`, for padding a short API answer.
pub fn fallback_captions_from(
    brand: &str,
    product: &str,
    start: usize,
    n: usize,
) -> Vec<String> {
    let templates = caption_templates(brand, product);
    (start..start + n)
        .map(|idx| templates[idx % templates.len()].clone())
        .collect()
}

/// One caption picked uniformly from the pool.
pub fn random_caption<R: Rng + ?Sized>(rng: &mut R, brand: &str, product: &str) -> String {
    let templates = caption_templates(brand, product);
    templates
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| format!("{brand} {product}"))
}

/// Splits model output into caption candidates.
///
/// Lines first, with bullets and whitespace stripped. If nothing survives, the
/// text is split on sentence punctuation instead.
pub fn split_caption_lines(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.trim_matches(BULLET_CHARS))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if !lines.is_empty() {
        return lines;
    }
    match SENTENCE_BREAK.as_ref() {
        Ok(re) => re
            .split(text)
            .map(|s| s.trim_matches(BULLET_CHARS))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Keeps the first `n` candidates, topping up from the template cycle where the
/// candidates ran out.
pub fn fit_captions(
    candidates: Vec<String>,
    brand: &str,
    product: &str,
    n: usize,
) -> Vec<String> {
    let mut out: Vec<String> = candidates.into_iter().take(n).collect();
    let have = out.len();
    if have < n {
        out.extend(fallback_captions_from(brand, product, have, n - have));
    }
    out
}

/// One line of the caption mapping file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionEntry {
    /// Image filename the caption belongs to
    pub filename: String,
    /// Caption text, tabs and newlines flattened to spaces
    pub text: String,
}

impl CaptionEntry {
    /// Builds an entry, flattening characters that would break the file format.
    pub fn new(filename: impl Into<String>, text: &str) -> Self {
        let text = text
            .chars()
            .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
            .collect::<String>()
            .trim()
            .to_string();
        Self {
            filename: filename.into(),
            text,
        }
    }
}

/// Replaces captions positionally; entries past the end of `captions` keep theirs.
pub fn merge_captions(entries: &mut [CaptionEntry], captions: &[String]) {
    for (entry, caption) in entries.iter_mut().zip(captions) {
        *entry = CaptionEntry::new(entry.filename.clone(), caption);
    }
}

/// Writes `captions.txt` into `dir`, overwriting what's there.
pub fn write_caption_file(dir: &Path, entries: &[CaptionEntry]) -> std::io::Result<()> {
    let body = entries
        .iter()
        .map(|entry| format!("{}\t{}", entry.filename, entry.text))
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(dir.join(CAPTIONS_FILENAME), body)
}

/// Reads a caption mapping file back, skipping malformed lines.
pub fn read_caption_file(dir: &Path) -> std::io::Result<Vec<CaptionEntry>> {
    let body = std::fs::read_to_string(dir.join(CAPTIONS_FILENAME))?;
    Ok(body
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(filename, text)| CaptionEntry {
            filename: filename.to_string(),
            text: text.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fallback_is_deterministic() {
        let first = fallback_captions("Acme", "Boots", 7);
        let second = fallback_captions("Acme", "Boots", 7);
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
        assert_eq!(first[0], first[5]);
        assert_eq!(first[1], "Upgrade your day with the Boots from Acme.");
    }

    #[test]
    fn fallback_zero_is_empty() {
        assert!(fallback_captions("Acme", "Boots", 0).is_empty());
    }

    #[test]
    fn splits_on_lines_and_strips_bullets() {
        let text =
            "- Walk taller in Acme Boots\n\n• Built for every trail\n  * Shop the drop today  \n";
        assert_eq!(
            split_caption_lines(text),
            vec![
                "Walk taller in Acme Boots",
                "Built for every trail",
                "Shop the drop today"
            ]
        );
    }

    #[test]
    fn bullet_only_lines_are_dropped() {
        assert_eq!(split_caption_lines("-\nReal one\n•"), vec!["Real one"]);
    }

    #[test]
    fn bullet_only_answers_yield_no_captions() {
        assert!(split_caption_lines("- \n•").is_empty());
        assert!(split_caption_lines("\n\n").is_empty());
        assert!(split_caption_lines("").is_empty());
    }

    #[test]
    fn fit_pads_by_continuing_the_cycle() {
        let fitted = fit_captions(vec!["One".to_string()], "Acme", "Boots", 3);
        let templates = caption_templates("Acme", "Boots");
        assert_eq!(fitted, vec!["One".to_string(), templates[1].clone(), templates[2].clone()]);
    }

    #[test]
    fn fit_truncates_extra_candidates() {
        let candidates = (0..10).map(|i| format!("line {i}")).collect();
        assert_eq!(fit_captions(candidates, "A", "B", 2), vec!["line 0", "line 1"]);
    }

    #[test]
    fn random_caption_comes_from_the_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = caption_templates("Acme", "Boots");
        for _ in 0..20 {
            assert!(pool.contains(&random_caption(&mut rng, "Acme", "Boots")));
        }
    }

    #[test]
    fn merge_replaces_positionally_and_keeps_tail() {
        let mut entries = vec![
            CaptionEntry::new("creative_01.jpg", "old one"),
            CaptionEntry::new("creative_02.jpg", "old two"),
        ];
        merge_captions(&mut entries, &["new\tone".to_string()]);
        assert_eq!(entries[0].text, "new one");
        assert_eq!(entries[1].text, "old two");
    }

    #[test]
    fn caption_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entries = vec![
            CaptionEntry::new("creative_01.jpg", "first"),
            CaptionEntry::new("creative_02.jpg", "second"),
        ];
        write_caption_file(dir.path(), &entries).expect("write captions");
        let body = std::fs::read_to_string(dir.path().join(CAPTIONS_FILENAME)).expect("read");
        assert_eq!(body, "creative_01.jpg\tfirst\ncreative_02.jpg\tsecond");
        assert_eq!(read_caption_file(dir.path()).expect("parse"), entries);
    }
}
