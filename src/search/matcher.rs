use crate::types::SiteSummary;

/// Ids of the sites whose name or overview mentions any keyword.
///
/// Matching is a case-insensitive substring test, first hit wins. When
/// nothing matches, the first `cap` sites are returned instead so a query
/// always yields something to show.
pub fn match_spots(keywords: &[String], spots: &[SiteSummary], cap: usize) -> Vec<String> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let matched: Vec<String> = spots
        .iter()
        .filter(|spot| {
            let haystack = format!("{} {}", spot.name, spot.overview).to_lowercase();
            needles.iter().any(|needle| haystack.contains(needle.as_str()))
        })
        .take(cap)
        .map(|spot| spot.id.clone())
        .collect();

    if matched.is_empty() {
        tracing::debug!("No keyword matches, returning first {} sites", cap);
        return spots.iter().take(cap).map(|spot| spot.id.clone()).collect();
    }
    matched
}
