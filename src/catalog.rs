//! Category catalog: the read-only source of word pools.
//!
//! The game core only needs `list_categories` and `get_category`. Two
//! implementations ship with the crate: an in-memory catalog for tests and
//! embedding, and a JSON file catalog that re-reads its file on every call so
//! edits show up without a restart.

use crate::types::Category;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Result type for catalog lookups
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Failed to read category file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse category file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of word categories
#[async_trait]
pub trait CategoryCatalog: Send + Sync {
    /// All categories, in catalog order
    async fn list_categories(&self) -> CatalogResult<Vec<Category>>;

    /// Look up a category by exact name
    async fn get_category(&self, name: &str) -> CatalogResult<Category> {
        self.list_categories()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

/// Fixed in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    categories: Vec<Category>,
}

impl StaticCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CategoryCatalog for StaticCatalog {
    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

/// On-disk layout: `{"categories": [{"name": "...", "words": [...]}]}`
#[derive(Debug, Deserialize)]
struct CategoryList {
    #[serde(default, alias = "Categories")]
    categories: Vec<Category>,
}

/// Catalog backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse catalog JSON
    pub fn parse(json: &str) -> CatalogResult<Vec<Category>> {
        let list: CategoryList = serde_json::from_str(json)?;
        Ok(list.categories)
    }
}

#[async_trait]
impl CategoryCatalog for JsonFileCatalog {
    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;
        let categories = Self::parse(&json)?;
        tracing::debug!(
            "Loaded {} categories from {}",
            categories.len(),
            self.path.display()
        );
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_catalog_lookup() {
        let catalog = StaticCatalog::new(vec![
            Category::new("Animals", ["Cat", "Dog"]),
            Category::new("Fruit", ["Apple", "Pear"]),
        ]);

        let fruit = catalog.get_category("Fruit").await.unwrap();
        assert!(fruit.words.contains("Pear"));

        let missing = catalog.get_category("Planets").await;
        assert!(matches!(missing, Err(CatalogError::NotFound(name)) if name == "Planets"));
    }

    #[test]
    fn test_parse_dedupes_words() {
        let categories = JsonFileCatalog::parse(
            r#"{"categories": [{"name": "Animals", "words": ["Cat", "Dog", "Cat"]}]}"#,
        )
        .unwrap();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].words.len(), 2);
    }

    #[test]
    fn test_parse_accepts_capitalized_root() {
        let categories =
            JsonFileCatalog::parse(r#"{"Categories": [{"name": "Sports", "words": ["Golf"]}]}"#)
                .unwrap();
        assert_eq!(categories[0].name, "Sports");
    }

    #[tokio::test]
    async fn test_json_file_catalog_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"categories": [{{"name": "Planets", "words": ["Mars", "Venus", "Earth"]}}]}}"#
        )
        .unwrap();

        let catalog = JsonFileCatalog::new(file.path());
        let planets = catalog.get_category("Planets").await.unwrap();
        assert_eq!(planets.words.len(), 3);
    }

    #[tokio::test]
    async fn test_json_file_catalog_missing_file() {
        let catalog = JsonFileCatalog::new("/definitely/not/here/categories.json");
        let result = catalog.list_categories().await;
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[tokio::test]
    async fn test_json_file_catalog_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let catalog = JsonFileCatalog::new(file.path());
        let result = catalog.list_categories().await;
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }
}
