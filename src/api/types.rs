use serde::Deserialize;

/// Sentinel shown until a character's last episode resolves, and kept when
/// resolution fails.
pub const UNKNOWN_EPISODE: &str = "Unknown";

fn unknown_episode() -> String {
    UNKNOWN_EPISODE.to_string()
}

fn unknown_field() -> String {
    "unknown".to_string()
}

/// A character record as returned by the API, plus the derived
/// `last_episode` name filled in by enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    /// Free text: "Alive", "Dead", "unknown", ...
    #[serde(default = "unknown_field")]
    pub status: String,
    #[serde(default = "unknown_field")]
    pub gender: String,
    /// Avatar image URI.
    #[serde(default)]
    pub image: String,
    /// Episode reference URIs, oldest first.
    pub episode: Vec<String>,
    /// Never read from the wire.
    #[serde(skip_deserializing, default = "unknown_episode")]
    pub last_episode: String,
}

impl Character {
    /// URI of the most recently referenced episode, if any.
    pub fn last_episode_url(&self) -> Option<&str> {
        self.episode.last().map(String::as_str)
    }

    pub fn is_enriched(&self) -> bool {
        self.last_episode != UNKNOWN_EPISODE
    }
}

/// Pagination block of a character page.
///
/// Only `next` drives behavior: when it is absent or null the upstream has
/// no further pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    pub next: Option<String>,
}

/// One page of `GET /character?page=n`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterPage {
    /// A missing `info` block is read as "no more pages".
    #[serde(default)]
    pub info: PageInfo,
    pub results: Vec<Character>,
}

impl CharacterPage {
    pub fn has_next(&self) -> bool {
        self.info.next.is_some()
    }
}

/// `GET {episode_url}`; only the name is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Episode {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RICK: &str = r#"{
        "id": 1,
        "name": "Rick Sanchez",
        "status": "Alive",
        "species": "Human",
        "gender": "Male",
        "image": "https://rickandmortyapi.com/api/character/avatar/1.jpeg",
        "episode": [
            "https://rickandmortyapi.com/api/episode/1",
            "https://rickandmortyapi.com/api/episode/51"
        ],
        "url": "https://rickandmortyapi.com/api/character/1"
    }"#;

    #[test]
    fn test_character_defaults_last_episode_to_unknown() {
        let c: Character = serde_json::from_str(RICK).unwrap();
        assert_eq!(c.id, 1);
        assert_eq!(c.name, "Rick Sanchez");
        assert_eq!(c.last_episode, UNKNOWN_EPISODE);
        assert!(!c.is_enriched());
        assert_eq!(
            c.last_episode_url(),
            Some("https://rickandmortyapi.com/api/episode/51")
        );
    }

    #[test]
    fn test_wire_last_episode_is_ignored() {
        let json = r#"{"id": 2, "name": "Morty", "episode": [], "last_episode": "Pilot"}"#;
        let c: Character = serde_json::from_str(json).unwrap();
        assert_eq!(c.last_episode, UNKNOWN_EPISODE);
        assert_eq!(c.status, "unknown");
        assert_eq!(c.last_episode_url(), None);
    }

    #[test]
    fn test_character_missing_id_is_parse_error() {
        let json = r#"{"name": "Nobody", "episode": []}"#;
        assert!(serde_json::from_str::<Character>(json).is_err());
    }

    #[test]
    fn test_page_with_null_next() {
        let json = format!(
            r#"{{"info": {{"count": 826, "pages": 42, "next": null, "prev": "x"}}, "results": [{}]}}"#,
            RICK
        );
        let page: CharacterPage = serde_json::from_str(&json).unwrap();
        assert!(!page.has_next());
        assert_eq!(page.results.len(), 1);
    }

    #[test]
    fn test_page_without_info_has_no_next() {
        let page: CharacterPage = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_without_results_is_parse_error() {
        let json = r#"{"info": {"next": "https://example.com/?page=2"}}"#;
        assert!(serde_json::from_str::<CharacterPage>(json).is_err());
    }

    #[test]
    fn test_episode_requires_name() {
        assert!(serde_json::from_str::<Episode>(r#"{"id": 1}"#).is_err());
        let ep: Episode = serde_json::from_str(r#"{"name": "Pilot", "episode": "S01E01"}"#).unwrap();
        assert_eq!(ep.name, "Pilot");
    }
}
