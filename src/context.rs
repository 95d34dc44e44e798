use eyre::{Result, WrapErr};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What we remember about the caller between requests.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UserContext {
    pub previous_products: Vec<String>,
    pub user_preferences: BTreeMap<String, Vec<String>>,
    pub comparison_criteria: Vec<String>,
}

impl UserContext {
    /// Appends `product` unless it is empty or already recorded.
    pub fn remember_product(&mut self, product: &str) -> bool {
        if product.is_empty() || self.previous_products.iter().any(|p| p == product) {
            return false;
        }
        self.previous_products.push(product.to_string());
        true
    }
}

/// JSON file holding a single `UserContext`. No locking: the last writer wins.
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or corrupt file yields a fresh context.
    pub async fn load(&self) -> UserContext {
        if !self.path.exists() {
            debug!(
                "No user context at {}, starting fresh.",
                self.path.display()
            );
            return UserContext::default();
        }

        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    "Failed to read user context {}: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                return UserContext::default();
            }
        };

        serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!(
                "Failed to parse user context {}: {}. Starting fresh.",
                self.path.display(),
                e
            );
            UserContext::default()
        })
    }

    pub async fn save(&self, context: &UserContext) -> Result<()> {
        let content =
            serde_json::to_string_pretty(context).wrap_err("Failed to serialize user context")?;
        fs::write(&self.path, content)
            .await
            .wrap_err_with(|| format!("Failed to write user context {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_product_skips_duplicates() {
        let mut ctx = UserContext::default();
        assert!(ctx.remember_product("iPhone 12"));
        assert!(ctx.remember_product("Pixel 8"));
        assert!(!ctx.remember_product("iPhone 12"));
        assert!(!ctx.remember_product(""));
        assert_eq!(ctx.previous_products, vec!["iPhone 12", "Pixel 8"]);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("absent.json"));
        let ctx = store.load().await;
        assert_eq!(ctx, UserContext::default());
        assert!(ctx.previous_products.is_empty());
        assert!(ctx.user_preferences.is_empty());
        assert!(ctx.comparison_criteria.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_context.json");
        std::fs::write(&path, "{ not json").unwrap();
        let ctx = ContextStore::new(&path).load().await;
        assert_eq!(ctx, UserContext::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("user_context.json"));

        let mut ctx = UserContext::default();
        ctx.remember_product("Galaxy S24");
        ctx.user_preferences.insert(
            "preferences".to_string(),
            vec!["i need a good camera".to_string()],
        );
        ctx.comparison_criteria.push("battery".to_string());

        store.save(&ctx).await.unwrap();
        assert_eq!(store.load().await, ctx);
    }

    #[tokio::test]
    async fn reads_file_written_by_other_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_context.json");
        std::fs::write(
            &path,
            r#"{"previous_products": ["iPhone 11"], "user_preferences": {"preferences": ["i like oled"]}, "comparison_criteria": []}"#,
        )
        .unwrap();
        let ctx = ContextStore::new(&path).load().await;
        assert_eq!(ctx.previous_products, vec!["iPhone 11"]);
        assert_eq!(ctx.user_preferences["preferences"], vec!["i like oled"]);
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("nope").join("ctx.json"));
        assert!(store.save(&UserContext::default()).await.is_err());
    }
}
