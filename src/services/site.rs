/// URL builder for the statistics site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    base_url: String,
}

impl SiteUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/p/{player_id}/gac-history/`
    pub fn history_index(&self, player_id: &str) -> String {
        format!(
            "{}/p/{}/gac-history/",
            self.base_url,
            urlencoding::encode(player_id)
        )
    }

    /// `{base}/p/{player_id}/gac-history/{ending}/`
    pub fn match_detail(&self, player_id: &str, ending: &str) -> String {
        format!("{}{}/", self.history_index(player_id), ending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_urls() {
        let site = SiteUrls::new("https://swgoh.gg/");
        assert_eq!(site.history_index("12345"), "https://swgoh.gg/p/12345/gac-history/");
        assert_eq!(
            site.match_detail("12345", "abc"),
            "https://swgoh.gg/p/12345/gac-history/abc/"
        );
    }

    #[test]
    fn test_player_id_is_encoded() {
        let site = SiteUrls::new("https://swgoh.gg");
        assert_eq!(
            site.history_index("../admin?x=1"),
            "https://swgoh.gg/p/..%2Fadmin%3Fx%3D1/gac-history/"
        );
    }
}
