/// `1` -> `1st`, `12` -> `12th`, `22` -> `22nd`
pub fn ordinal_suffix(number: usize) -> String {
    let suffix = match (number % 10, number % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{number}{suffix}")
}

/// Rank column text, `--` for contestants without a rank
pub fn format_rank(rank: Option<usize>) -> String {
    rank.map(ordinal_suffix).unwrap_or_else(|| "--".to_string())
}

pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

/// Estimated final score, rounded to whole points
pub fn format_projected_score(projected: Option<f64>) -> String {
    match projected {
        Some(score) => format!("{score:.0}"),
        None => "--".to_string(),
    }
}
