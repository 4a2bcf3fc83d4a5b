//! JSON response types and formatting for CLI output.

use memoria::memory_types::{Metadata, ScoredMemory};
use serde::Serialize;

/// Response for a saved memory.
#[derive(Serialize)]
pub struct SaveResponse {
    pub status: String,
    pub id: String,
}

/// Response for search results.
#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

/// Individual search result item.
#[derive(Serialize)]
pub struct SearchResultItem {
    pub id: String,
    pub content: String,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl From<ScoredMemory> for SearchResultItem {
    fn from(memory: ScoredMemory) -> Self {
        Self {
            id: memory.id.to_string(),
            content: memory.content,
            similarity: memory.similarity,
            metadata: memory.metadata,
        }
    }
}

/// Response describing the configured store.
#[derive(Serialize)]
pub struct StatsResponse {
    pub backend: String,
    pub model: String,
    pub dimension: usize,
    pub top_k: usize,
    pub memories: u64,
}

/// Response for the version command.
#[derive(Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Print a value as formatted JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria::MemoryId;

    #[test]
    fn test_serialize_save_response() {
        let response = SaveResponse {
            status: "success".to_string(),
            id: "test-id".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"id\":\"test-id\""));
    }

    #[test]
    fn test_serialize_search_response() {
        let id = MemoryId::new();
        let response = SearchResponse {
            results: vec![SearchResultItem::from(ScoredMemory {
                id,
                content: "test content".to_string(),
                similarity: 0.95,
                metadata: None,
            })],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"similarity\":0.95"));
        assert!(json.contains(&id.to_string()));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn test_serialize_stats_response() {
        let response = StatsResponse {
            backend: "local".to_string(),
            model: "sentence-transformers/paraphrase-MiniLM-L3-v2".to_string(),
            dimension: 384,
            top_k: 5,
            memories: 42,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"backend\":\"local\""));
        assert!(json.contains("\"memories\":42"));
    }
}
