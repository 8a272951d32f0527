//! Season-range grammar for multi-season bundles.
//!
//! Two notations are recognized in a descriptor stem:
//!
//! | notation | stem example        | season 2 folder   |
//! |----------|---------------------|-------------------|
//! | word     | `Show Season 1-3`   | `Show Season 2`   |
//! | code     | `Show.S01-S03.1080p`| `Show.S02.1080p`  |
//!
//! The word notation takes a short numeral, the code notation a zero-padded one.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static WORD_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\W_][Ss]eason[\W_](\d[\W_]\d{1,2})(?:[\W_]|$)").expect("valid regex")
});

static CODE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\W_][Ss](\d{2}[\W_][Ss]?\d{2})(?:[\W_]|$)").expect("valid regex")
});

static EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"S(\d{2})E\d{2}").expect("valid regex"));

/// How a season range is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonNotation {
    /// `Season 1-3`
    Word,
    /// `S01-S03`
    Code,
}

impl SeasonNotation {
    fn pattern(&self) -> &'static Regex {
        match self {
            SeasonNotation::Word => &WORD_RANGE,
            SeasonNotation::Code => &CODE_RANGE,
        }
    }

    /// Numeral that replaces the range.
    pub fn render(&self, season: u32) -> String {
        match self {
            SeasonNotation::Word => season.to_string(),
            SeasonNotation::Code => format!("{:02}", season),
        }
    }
}

/// Substitution table, applied in order.
const NOTATIONS: [SeasonNotation; 2] = [SeasonNotation::Word, SeasonNotation::Code];

/// Whether the stem names a multi-season range.
pub fn is_multi_season(stem: &str) -> bool {
    NOTATIONS.iter().any(|n| n.pattern().is_match(stem))
}

/// Whether a name carries an `SxxEyy` episode code.
pub fn is_episode(name: &str) -> bool {
    EPISODE.is_match(name)
}

/// Season number of an episode file name (`S02E04` gives 2).
pub fn episode_season(file_name: &str) -> Option<u32> {
    EPISODE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Folder name for one season of a multi-season stem.
///
/// Returns `None` when the stem has no season range or the file is not an
/// episode.
pub fn season_folder_name(stem: &str, file_name: &str) -> Option<String> {
    if !is_multi_season(stem) {
        return None;
    }
    let season = episode_season(file_name)?;

    let mut name = stem.to_string();
    for notation in NOTATIONS {
        name = substitute(notation.pattern(), &name, &notation.render(season));
    }
    Some(name)
}

/// Replace the range group of every match with `numeral`.
fn substitute(pattern: &Regex, text: &str, numeral: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        if let Some(range) = caps.get(1) {
            result.push_str(&text[last..range.start()]);
            result.push_str(numeral);
            last = range.end();
        }
    }
    result.push_str(&text[last..]);
    result
}
