//! Collection schema and the schema manager.
//!
//! The movie class is declared once per import. An existing class with the
//! same name is deleted first; there is no in-place update path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CollectionConfig;
use crate::weaviate::VectorStore;

/// A class definition as accepted by `POST /v1/schema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class: String,
    pub description: String,
    pub vectorizer: String,
    pub vector_index_config: VectorIndexConfig,
    pub module_config: BTreeMap<String, ClassModuleConfig>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    pub distance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassModuleConfig {
    pub vectorize_class_name: bool,
    pub model: String,
    pub model_version: String,
    #[serde(rename = "type")]
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub data_type: Vec<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_config: Option<BTreeMap<String, PropertyModuleConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyModuleConfig {
    pub skip: bool,
    pub vectorize_property_name: bool,
}

/// (name, data type, description, vectorized)
const MOVIE_PROPERTIES: &[(&str, &str, &str, bool)] = &[
    ("movie_id", "number", "The id of the movie", false),
    ("title", "text", "The name of the movie", false),
    ("year", "number", "The year in which movie was published", false),
    ("poster_link", "text", "The poster link of the movie", false),
    ("genres", "text", "The genres of the movie", false),
    ("actors", "text", "The actors of the movie", false),
    ("director", "text", "Director of the movie", false),
    ("description", "text", "overview of the movie", true),
    ("plot", "text", "Plot of the movie from Wikipedia", true),
    ("keywords", "text", "main keywords of the movie", true),
];

/// Build the movie class definition for the configured collection.
pub fn movie_class(config: &CollectionConfig) -> ClassSchema {
    let properties = MOVIE_PROPERTIES
        .iter()
        .map(|&(name, data_type, description, vectorized)| {
            let module_config = (!vectorized).then(|| {
                BTreeMap::from([(
                    config.vectorizer.clone(),
                    PropertyModuleConfig {
                        skip: true,
                        vectorize_property_name: false,
                    },
                )])
            });
            Property {
                name: name.to_string(),
                data_type: vec![data_type.to_string()],
                description: description.to_string(),
                module_config,
            }
        })
        .collect();

    ClassSchema {
        class: config.name.clone(),
        description: config.description.clone(),
        vectorizer: config.vectorizer.clone(),
        vector_index_config: VectorIndexConfig {
            distance: config.distance.clone(),
        },
        module_config: BTreeMap::from([(
            config.vectorizer.clone(),
            ClassModuleConfig {
                vectorize_class_name: false,
                model: config.model.clone(),
                model_version: config.model_version.clone(),
                model_type: config.model_type.clone(),
            },
        )]),
        properties,
    }
}

/// Whether [`recreate_collection`] removed an existing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recreated {
    Created,
    Replaced,
}

/// Delete the class if it already exists, then create it from `schema`.
///
/// Deleting a class drops every object stored in it.
pub async fn recreate_collection(
    store: &dyn VectorStore,
    schema: &ClassSchema,
) -> Result<Recreated> {
    let existing = store
        .list_classes()
        .await
        .context("Failed to list remote classes")?;

    let mut outcome = Recreated::Created;
    if existing.iter().any(|c| c == &schema.class) {
        tracing::warn!(class = %schema.class, "deleting existing class");
        store
            .delete_class(&schema.class)
            .await
            .with_context(|| format!("Failed to delete class {}", schema.class))?;
        outcome = Recreated::Replaced;
    }

    store
        .create_class(schema)
        .await
        .with_context(|| format!("Failed to create class {}", schema.class))?;
    tracing::info!(class = %schema.class, ?outcome, "class ready");

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weaviate::testing::MemoryStore;

    fn is_vectorized(property: &Property, vectorizer: &str) -> bool {
        property
            .module_config
            .as_ref()
            .and_then(|m| m.get(vectorizer))
            .map_or(true, |m| !m.skip)
    }

    #[test]
    fn schema_json_shape() {
        let schema = movie_class(&CollectionConfig::default());
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["class"], "Awesome_moviate_movies");
        assert_eq!(json["vectorizer"], "text2vec-openai");
        assert_eq!(json["vectorIndexConfig"]["distance"], "cosine");
        let module = &json["moduleConfig"]["text2vec-openai"];
        assert_eq!(module["vectorizeClassName"], false);
        assert_eq!(module["model"], "ada");
        assert_eq!(module["modelVersion"], "002");
        assert_eq!(module["type"], "text");

        let props = json["properties"].as_array().unwrap();
        assert_eq!(props.len(), 10);
        assert_eq!(props[0]["name"], "movie_id");
        assert_eq!(props[0]["dataType"][0], "number");
        assert_eq!(
            props[0]["moduleConfig"]["text2vec-openai"]["skip"],
            serde_json::json!(true)
        );
        assert!(props[7].get("moduleConfig").is_none());
    }

    #[test]
    fn only_text_bodies_are_vectorized() {
        let schema = movie_class(&CollectionConfig::default());
        let vectorized: Vec<&str> = schema
            .properties
            .iter()
            .filter(|p| is_vectorized(p, "text2vec-openai"))
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(vectorized, vec!["description", "plot", "keywords"]);
    }

    #[tokio::test]
    async fn recreate_creates_when_absent() {
        let store = MemoryStore::new();
        let schema = movie_class(&CollectionConfig::default());

        let outcome = recreate_collection(&store, &schema).await.unwrap();
        assert_eq!(outcome, Recreated::Created);
        assert_eq!(store.classes(), vec![schema.class.clone()]);
        assert_eq!(store.deleted(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn recreate_replaces_existing_class() {
        let store = MemoryStore::new();
        let schema = movie_class(&CollectionConfig::default());
        store.seed_class(&schema.class, 5);
        store.seed_class("Other", 2);

        let outcome = recreate_collection(&store, &schema).await.unwrap();
        assert_eq!(outcome, Recreated::Replaced);
        assert_eq!(store.deleted(), vec![schema.class.clone()]);
        assert_eq!(store.object_count(&schema.class), 0);
        assert_eq!(store.object_count("Other"), 2);
    }
}
