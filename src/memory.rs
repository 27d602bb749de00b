use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, ProfileChanges, Role, User},
    },
    db::RepoError,
    favorites::repo::FavoriteRepo,
    meals::{
        repo::RecipeRepo,
        repo_types::{replacement, Recipe, RecipeHeader, RecipePatch, RecipeRow},
    },
};

/// Ingredient or step row; `recipe_id` is the back-reference to its owner.
#[derive(Debug, Clone)]
struct StoredChild {
    recipe_id: Uuid,
    position: i32,
    body: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<RecipeRow>,
    ingredients: Vec<StoredChild>,
    steps: Vec<StoredChild>,
    favorites: Vec<(Uuid, Uuid)>,
}

/// Process-local store with the same constraints as the Postgres schema:
/// unique email, unique favorite pair, cascading deletes, no NUL in text.
/// Every write runs against a copy of the tables that replaces the live
/// ones only when the whole operation succeeds.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T + Send,
        T: Send,
    {
        let guard = self.tables.lock().await;
        f(&guard)
    }

    async fn write<T, F>(&self, f: F) -> Result<T, RepoError>
    where
        F: FnOnce(&mut Tables) -> Result<T, RepoError> + Send,
        T: Send,
    {
        let mut guard = self.tables.lock().await;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}

fn check_text<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<(), RepoError> {
    if values.into_iter().any(|v| v.contains('\0')) {
        return Err(RepoError::Backend(
            "invalid byte sequence for encoding \"UTF8\": 0x00".into(),
        ));
    }
    Ok(())
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, RepoError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepoError::NotFound)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn children_of(list: &[StoredChild], recipe_id: Uuid) -> Vec<String> {
        let mut rows: Vec<&StoredChild> = list.iter().filter(|c| c.recipe_id == recipe_id).collect();
        rows.sort_by_key(|c| c.position);
        rows.into_iter().map(|c| c.body.clone()).collect()
    }

    fn push_children(
        list: &mut Vec<StoredChild>,
        recipe_id: Uuid,
        items: &[String],
    ) -> Result<(), RepoError> {
        for (position, body) in items.iter().enumerate() {
            check_text([body.as_str()])?;
            list.push(StoredChild {
                recipe_id,
                position: position as i32,
                body: body.clone(),
            });
        }
        Ok(())
    }

    fn recipe(&self, row: &RecipeRow) -> Recipe {
        Recipe::from_parts(
            row.clone(),
            Self::children_of(&self.ingredients, row.id),
            Self::children_of(&self.steps, row.id),
        )
    }

    fn recipe_by_id(&self, id: Uuid) -> Option<Recipe> {
        self.recipes.iter().find(|r| r.id == id).map(|r| self.recipe(r))
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        self.write(move |t| {
            check_text([
                new.username.as_str(),
                new.email.as_str(),
                new.password_hash.as_str(),
                new.image_url.as_str(),
            ])?;
            if t.email_taken(&new.email, None) {
                return Err(RepoError::Conflict("users_email_key".into()));
            }
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::new_v4(),
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                role: Role::User,
                image_url: new.image_url,
                token_version: 1,
                created_at: now,
                updated_at: now,
            };
            t.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self
            .read(|t| t.users.iter().find(|u| u.id == id).cloned())
            .await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .read(|t| t.users.iter().find(|u| u.email == email).cloned())
            .await)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        self.write(move |t| {
            if let Some(email) = &changes.email {
                check_text([email.as_str()])?;
                if t.email_taken(email, Some(id)) {
                    return Err(RepoError::Conflict("users_email_key".into()));
                }
            }
            let user = t.user_mut(id)?;
            if let Some(username) = changes.username {
                check_text([username.as_str()])?;
                user.username = username;
            }
            if let Some(email) = changes.email {
                user.email = email;
                user.token_version += 1;
            }
            user.updated_at = OffsetDateTime::now_utc();
            Ok(user.clone())
        })
        .await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepoError> {
        let password_hash = password_hash.to_string();
        self.write(move |t| {
            check_text([password_hash.as_str()])?;
            let user = t.user_mut(id)?;
            user.password_hash = password_hash;
            user.token_version += 1;
            user.updated_at = OffsetDateTime::now_utc();
            Ok(user.clone())
        })
        .await
    }

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<User, RepoError> {
        let image_url = image_url.to_string();
        self.write(move |t| {
            check_text([image_url.as_str()])?;
            let user = t.user_mut(id)?;
            user.image_url = image_url;
            user.updated_at = OffsetDateTime::now_utc();
            Ok(user.clone())
        })
        .await
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn create(
        &self,
        owner_id: Uuid,
        header: RecipeHeader,
        ingredients: &[String],
        steps: &[String],
    ) -> Result<Recipe, RepoError> {
        self.write(move |t| {
            if !t.users.iter().any(|u| u.id == owner_id) {
                return Err(RepoError::MissingReference("meal_recipes_user_id_fkey".into()));
            }
            check_text([
                header.name.as_str(),
                header.category.as_str(),
                header.image_url.as_str(),
                header.duration.as_str(),
                header.complexity.as_str(),
                header.affordability.as_str(),
            ])?;

            let now = OffsetDateTime::now_utc();
            let row = RecipeRow {
                id: Uuid::new_v4(),
                user_id: owner_id,
                name: header.name,
                category: header.category,
                image_url: header.image_url,
                duration: header.duration,
                complexity: header.complexity,
                affordability: header.affordability,
                is_gluten_free: header.is_gluten_free,
                is_lactose_free: header.is_lactose_free,
                is_vegan: header.is_vegan,
                created_at: now,
                updated_at: now,
            };
            t.recipes.push(row.clone());
            Tables::push_children(&mut t.ingredients, row.id, ingredients)?;
            Tables::push_children(&mut t.steps, row.id, steps)?;
            Ok(t.recipe(&row))
        })
        .await
    }

    async fn replace(
        &self,
        id: Uuid,
        patch: RecipePatch,
        ingredients: Option<Vec<String>>,
        steps: Option<Vec<String>>,
    ) -> Result<Recipe, RepoError> {
        self.write(move |t| {
            let row = t
                .recipes
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(RepoError::NotFound)?;
            patch.apply(row);
            check_text([
                row.name.as_str(),
                row.category.as_str(),
                row.image_url.as_str(),
                row.duration.as_str(),
                row.complexity.as_str(),
                row.affordability.as_str(),
            ])?;
            row.updated_at = OffsetDateTime::now_utc();
            let row = row.clone();

            if let Some(items) = replacement(ingredients) {
                t.ingredients.retain(|c| c.recipe_id != id);
                Tables::push_children(&mut t.ingredients, id, &items)?;
            }
            if let Some(items) = replacement(steps) {
                t.steps.retain(|c| c.recipe_id != id);
                Tables::push_children(&mut t.steps, id, &items)?;
            }
            Ok(t.recipe(&row))
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.write(move |t| {
            let before = t.recipes.len();
            t.recipes.retain(|r| r.id != id);
            if t.recipes.len() == before {
                return Err(RepoError::NotFound);
            }
            t.ingredients.retain(|c| c.recipe_id != id);
            t.steps.retain(|c| c.recipe_id != id);
            t.favorites.retain(|(_, recipe_id)| *recipe_id != id);
            Ok(())
        })
        .await
    }

    async fn list(&self, name_filter: Option<&str>) -> Result<Vec<Recipe>, RepoError> {
        let query = name_filter.map(words);
        Ok(self
            .read(move |t| match query {
                None => t.recipes.iter().map(|r| t.recipe(r)).collect(),
                Some(query) => {
                    let mut scored: Vec<(usize, &RecipeRow)> = t
                        .recipes
                        .iter()
                        .map(|r| {
                            let name = words(&r.name);
                            (query.iter().filter(|w| name.contains(*w)).count(), r)
                        })
                        .filter(|(score, _)| *score > 0)
                        .collect();
                    scored.sort_by(|a, b| b.0.cmp(&a.0));
                    scored.into_iter().map(|(_, r)| t.recipe(r)).collect()
                }
            })
            .await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, RepoError> {
        Ok(self.read(|t| t.recipe_by_id(id)).await)
    }
}

#[async_trait]
impl FavoriteRepo for MemoryStore {
    async fn add(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), RepoError> {
        self.write(move |t| {
            if !t.recipes.iter().any(|r| r.id == recipe_id)
                || !t.users.iter().any(|u| u.id == user_id)
            {
                return Err(RepoError::MissingReference(
                    "favorite_user_meal_meal_recipe_id_fkey".into(),
                ));
            }
            if !t.favorites.contains(&(user_id, recipe_id)) {
                t.favorites.push((user_id, recipe_id));
            }
            Ok(())
        })
        .await
    }

    async fn contains(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .read(|t| t.favorites.contains(&(user_id, recipe_id)))
            .await)
    }

    async fn remove(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        self.write(move |t| {
            let before = t.favorites.len();
            t.favorites.retain(|pair| *pair != (user_id, recipe_id));
            Ok(t.favorites.len() != before)
        })
        .await
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Recipe>, RepoError> {
        Ok(self
            .read(|t| {
                t.favorites
                    .iter()
                    .filter(|(u, _)| *u == user_id)
                    .filter_map(|(_, recipe_id)| t.recipe_by_id(*recipe_id))
                    .collect()
            })
            .await)
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    fn header(name: &str) -> RecipeHeader {
        RecipeHeader {
            name: name.into(),
            category: "Dinner".into(),
            image_url: "https://img/x.png".into(),
            duration: "30m".into(),
            complexity: "simple".into(),
            affordability: "affordable".into(),
            is_gluten_free: false,
            is_lactose_free: false,
            is_vegan: true,
        }
    }

    async fn owner(store: &MemoryStore) -> User {
        UserRepo::create(
            store,
            NewUser {
                username: "owner".into(),
                email: "owner@x.com".into(),
                password_hash: "h".into(),
                image_url: String::new(),
            },
        )
        .await
        .unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failed_child_insert_leaves_no_header() {
        let store = MemoryStore::new();
        let user = owner(&store).await;

        let err = RecipeRepo::create(
            &store,
            user.id,
            header("Bread"),
            &strings(&["flour", "wa\0ter"]),
            &strings(&["knead"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));

        assert!(RecipeRepo::list(&store, None).await.unwrap().is_empty());
        let tables = store.tables.lock().await;
        assert!(tables.ingredients.is_empty());
        assert!(tables.steps.is_empty());
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_aggregate() {
        let store = MemoryStore::new();
        let user = owner(&store).await;
        let recipe = RecipeRepo::create(
            &store,
            user.id,
            header("Soup"),
            &strings(&["water", "salt"]),
            &strings(&["boil"]),
        )
        .await
        .unwrap();

        let patch = RecipePatch {
            name: Some("Better soup".into()),
            ..Default::default()
        };
        let err = store
            .replace(
                recipe.id,
                patch,
                Some(strings(&["stock"])),
                Some(strings(&["simmer", "bad\0step"])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));

        let after = RecipeRepo::get(&store, recipe.id).await.unwrap().unwrap();
        assert_eq!(after.name, "Soup");
        assert_eq!(after.ingredients, strings(&["water", "salt"]));
        assert_eq!(after.steps, strings(&["boil"]));
    }

    #[tokio::test]
    async fn delete_cascades_to_children_and_favorites() {
        let store = MemoryStore::new();
        let user = owner(&store).await;
        let recipe = RecipeRepo::create(
            &store,
            user.id,
            header("Salad"),
            &strings(&["lettuce"]),
            &strings(&["toss"]),
        )
        .await
        .unwrap();
        FavoriteRepo::add(&store, user.id, recipe.id).await.unwrap();

        RecipeRepo::delete(&store, recipe.id).await.unwrap();

        let tables = store.tables.lock().await;
        assert!(tables.recipes.is_empty());
        assert!(tables.ingredients.iter().all(|c| c.recipe_id != recipe.id));
        assert!(tables.steps.iter().all(|c| c.recipe_id != recipe.id));
        assert!(tables.favorites.is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_recipe_is_not_found() {
        let store = MemoryStore::new();
        let err = RecipeRepo::delete(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn favorite_of_missing_recipe_is_a_missing_reference() {
        let store = MemoryStore::new();
        let user = owner(&store).await;
        let err = FavoriteRepo::add(&store, user.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingReference(_)));
        assert!(store.tables.lock().await.favorites.is_empty());
    }

    #[tokio::test]
    async fn name_search_ranks_by_matching_words() {
        let store = MemoryStore::new();
        let user = owner(&store).await;
        for name in ["Chicken Curry", "Beef Stew", "Chicken Noodle Soup", "Curry Chicken Pie"] {
            RecipeRepo::create(&store, user.id, header(name), &strings(&["x"]), &strings(&["y"]))
                .await
                .unwrap();
        }

        let hits = RecipeRepo::list(&store, Some("chicken curry")).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Chicken Curry", "Curry Chicken Pie", "Chicken Noodle Soup"]);

        assert!(RecipeRepo::list(&store, Some("tofu")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn email_uniqueness_is_enforced_on_update() {
        let store = MemoryStore::new();
        let a = owner(&store).await;
        let b = UserRepo::create(
            &store,
            NewUser {
                username: "b".into(),
                email: "b@x.com".into(),
                password_hash: "h".into(),
                image_url: String::new(),
            },
        )
        .await
        .unwrap();

        let err = store
            .update_profile(
                b.id,
                ProfileChanges {
                    username: None,
                    email: Some(a.email.clone()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        let unchanged = store.find_by_id(b.id).await.unwrap().unwrap();
        assert_eq!(unchanged.token_version, 1);
    }
}
