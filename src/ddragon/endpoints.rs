//! URL builders for the Data Dragon CDN.
//!
//! Data payloads are versioned and localized; image paths are neither.

pub const DEFAULT_BASE_URL: &str = "https://ddragon.leagueoflegends.com";
pub const DEFAULT_LOCALE: &str = "en_US";

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    locale: String,
}

impl Endpoints {
    pub fn new(base: &str, locale: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            locale: locale.to_string(),
        }
    }

    pub fn versions(&self) -> String {
        format!("{}/api/versions.json", self.base)
    }

    pub fn champion_index(&self, version: &str) -> String {
        format!(
            "{}/cdn/{}/data/{}/champion.json",
            self.base, version, self.locale
        )
    }

    pub fn champion_detail(&self, version: &str, champion_id: &str) -> String {
        format!(
            "{}/cdn/{}/data/{}/champion/{}.json",
            self.base, version, self.locale, champion_id
        )
    }

    /// Portrait shown on the champion list; always skin 0.
    pub fn loading_image(&self, champion_id: &str) -> String {
        format!("{}/cdn/img/champion/loading/{}_0.jpg", self.base, champion_id)
    }

    pub fn splash_image(&self, champion_id: &str, number: u32) -> String {
        format!(
            "{}/cdn/img/champion/splash/{}_{}.jpg",
            self.base, champion_id, number
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_LOCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let e = Endpoints::default();
        assert_eq!(
            e.versions(),
            "https://ddragon.leagueoflegends.com/api/versions.json"
        );
        assert_eq!(
            e.champion_detail("14.2.1", "Aatrox"),
            "https://ddragon.leagueoflegends.com/cdn/14.2.1/data/en_US/champion/Aatrox.json"
        );
        assert_eq!(
            e.splash_image("Aatrox", 7),
            "https://ddragon.leagueoflegends.com/cdn/img/champion/splash/Aatrox_7.jpg"
        );
    }

    #[test]
    fn test_trailing_slash_and_locale() {
        let e = Endpoints::new("http://localhost:8080/", "de_DE");
        assert_eq!(
            e.champion_index("14.1.1"),
            "http://localhost:8080/cdn/14.1.1/data/de_DE/champion.json"
        );
        assert_eq!(
            e.loading_image("Ahri"),
            "http://localhost:8080/cdn/img/champion/loading/Ahri_0.jpg"
        );
    }
}
