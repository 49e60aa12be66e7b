use scraper::{Html, Selector};

/// Path prefix of every match link on a player's history page
pub fn history_path_prefix(player_id: &str) -> String {
    format!("/p/{}/gac-history/", player_id)
}

/// Reduce a match link to its ending token
///
/// Removes the history prefix (raw or percent-encoded player id) and the
/// slashes around what remains.
pub fn ending_from_href(href: &str, player_id: &str) -> String {
    let mut part = href.replace(&history_path_prefix(player_id), "");
    let encoded = urlencoding::encode(player_id);
    if encoded != player_id {
        part = part.replace(&history_path_prefix(&encoded), "");
    }
    part.trim_matches('/').to_string()
}

/// Collect up to `limit` match endings from a history page, in page order
///
/// Anchors without an `href` (or linking to the index itself) are skipped.
pub fn parse_endings(html: &str, anchor: &Selector, player_id: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(anchor)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| ending_from_href(href, player_id))
        .filter(|ending| !ending.is_empty())
        .take(limit)
        .collect()
}
