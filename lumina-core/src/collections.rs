//! Collection management
//!
//! Built-in collections are fixed and computed; custom collections and the
//! book membership map are persisted under `collections` and
//! `bookCollections`.

use crate::error::CollectionError;
use crate::library::Membership;
use crate::storage::{keys, Store};
use crate::types::collection::is_builtin_id;
use crate::types::{builtin_collections, Collection};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    custom: Vec<Collection>,
    membership: Membership,
}

/// Shared handle to collections and their membership
#[derive(Clone)]
pub struct Collections {
    state: Arc<Mutex<State>>,
    store: Store,
}

impl Collections {
    pub async fn load(store: Store) -> Self {
        let custom = store.get_json(keys::COLLECTIONS).await.unwrap_or_default();
        let membership = store.get_json(keys::BOOK_COLLECTIONS).await.unwrap_or_default();
        Self {
            state: Arc::new(Mutex::new(State { custom, membership })),
            store,
        }
    }

    /// Built-in collections followed by custom ones
    pub async fn list(&self) -> Vec<Collection> {
        let state = self.state.lock().await;
        let mut all = builtin_collections();
        all.extend(state.custom.iter().cloned());
        all
    }

    pub async fn get(&self, id: &str) -> Option<Collection> {
        self.list().await.into_iter().find(|c| c.id == id)
    }

    /// Create a custom collection
    pub async fn create(&self, name: &str, icon: Option<&str>) -> Result<Collection, CollectionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CollectionError::EmptyName);
        }
        let collection = Collection::custom(
            uuid::Uuid::new_v4().to_string(),
            name,
            icon.unwrap_or("folder"),
        );

        let mut state = self.state.lock().await;
        state.custom.push(collection.clone());
        self.store.set_json(keys::COLLECTIONS, &state.custom).await?;
        tracing::info!(id = %collection.id, name, "Created collection");
        Ok(collection)
    }

    /// Rename a custom collection
    pub async fn rename(&self, id: &str, name: &str) -> Result<(), CollectionError> {
        if is_builtin_id(id) {
            return Err(CollectionError::BuiltIn(id.to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(CollectionError::EmptyName);
        }

        let mut state = self.state.lock().await;
        let collection = state
            .custom
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?;
        collection.name = name.to_string();
        self.store.set_json(keys::COLLECTIONS, &state.custom).await?;
        Ok(())
    }

    /// Delete a custom collection and every membership in it
    pub async fn delete(&self, id: &str) -> Result<(), CollectionError> {
        if is_builtin_id(id) {
            return Err(CollectionError::BuiltIn(id.to_string()));
        }

        let mut state = self.state.lock().await;
        let before = state.custom.len();
        state.custom.retain(|c| c.id != id);
        if state.custom.len() == before {
            return Err(CollectionError::NotFound(id.to_string()));
        }
        for ids in state.membership.values_mut() {
            ids.remove(id);
        }
        state.membership.retain(|_, ids| !ids.is_empty());

        self.store.set_json(keys::COLLECTIONS, &state.custom).await?;
        self.store.set_json(keys::BOOK_COLLECTIONS, &state.membership).await?;
        Ok(())
    }

    /// Put a book into a custom collection
    pub async fn add_book(&self, collection_id: &str, book_id: &str) -> Result<(), CollectionError> {
        if is_builtin_id(collection_id) {
            return Err(CollectionError::BuiltIn(collection_id.to_string()));
        }

        let mut state = self.state.lock().await;
        if !state.custom.iter().any(|c| c.id == collection_id) {
            return Err(CollectionError::NotFound(collection_id.to_string()));
        }
        state
            .membership
            .entry(book_id.to_string())
            .or_default()
            .insert(collection_id.to_string());
        self.store.set_json(keys::BOOK_COLLECTIONS, &state.membership).await?;
        Ok(())
    }

    /// Take a book out of a custom collection
    pub async fn remove_book(&self, collection_id: &str, book_id: &str) -> Result<(), CollectionError> {
        if is_builtin_id(collection_id) {
            return Err(CollectionError::BuiltIn(collection_id.to_string()));
        }

        let mut state = self.state.lock().await;
        if let Some(ids) = state.membership.get_mut(book_id) {
            ids.remove(collection_id);
            if ids.is_empty() {
                state.membership.remove(book_id);
            }
        }
        self.store.set_json(keys::BOOK_COLLECTIONS, &state.membership).await?;
        Ok(())
    }

    /// Custom collections containing a book
    pub async fn collections_of(&self, book_id: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .membership
            .get(book_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the membership map
    pub async fn membership(&self) -> Membership {
        self.state.lock().await.membership.clone()
    }

    /// Drop all memberships of a removed book
    pub async fn forget_book(&self, book_id: &str) -> Result<(), CollectionError> {
        let mut state = self.state.lock().await;
        if state.membership.remove(book_id).is_some() {
            self.store.set_json(keys::BOOK_COLLECTIONS, &state.membership).await?;
        }
        Ok(())
    }

    /// Drop every membership (library cleared)
    pub async fn forget_all(&self) -> Result<(), CollectionError> {
        let mut state = self.state.lock().await;
        state.membership.clear();
        self.store.set_json(keys::BOOK_COLLECTIONS, &state.membership).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    async fn collections() -> Collections {
        Collections::load(Store::new(Arc::new(MemoryStorage::new()))).await
    }

    #[tokio::test]
    async fn test_builtins_are_protected() {
        let collections = collections().await;
        assert!(matches!(
            collections.rename("finished", "Done").await,
            Err(CollectionError::BuiltIn(_))
        ));
        assert!(matches!(
            collections.delete("all").await,
            Err(CollectionError::BuiltIn(_))
        ));
        assert!(matches!(
            collections.add_book("reading", "b1").await,
            Err(CollectionError::BuiltIn(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_lifecycle() {
        let collections = collections().await;
        let scifi = collections.create("Sci-Fi", Some("rocket")).await.unwrap();
        collections.add_book(&scifi.id, "b1").await.unwrap();
        assert_eq!(collections.collections_of("b1").await, vec![scifi.id.clone()]);

        collections.rename(&scifi.id, "Science Fiction").await.unwrap();
        assert_eq!(
            collections.get(&scifi.id).await.unwrap().name,
            "Science Fiction"
        );

        collections.delete(&scifi.id).await.unwrap();
        assert!(collections.collections_of("b1").await.is_empty());
        assert_eq!(collections.list().await.len(), builtin_collections().len());
    }

    #[tokio::test]
    async fn test_membership_persists() {
        let store = Store::new(Arc::new(MemoryStorage::new()));
        let collections = Collections::load(store.clone()).await;
        let shelf = collections.create("Shelf", None).await.unwrap();
        collections.add_book(&shelf.id, "b1").await.unwrap();

        let reloaded = Collections::load(store).await;
        assert!(reloaded.membership().await["b1"].contains(&shelf.id));
        reloaded.forget_book("b1").await.unwrap();
        assert!(reloaded.membership().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let collections = collections().await;
        assert!(matches!(
            collections.create("   ", None).await,
            Err(CollectionError::EmptyName)
        ));
    }
}
