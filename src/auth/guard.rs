use crate::{
    auth::repo_types::{Role, User},
    error::AppError,
    meals::repo_types::Recipe,
};

/// Only the owner may edit a recipe.
pub fn can_mutate(identity: &User, recipe: &Recipe) -> bool {
    identity.id == recipe.user_id
}

/// Owners and admins may delete.
pub fn can_delete(identity: &User, recipe: &Recipe) -> bool {
    can_mutate(identity, recipe) || identity.role == Role::Admin
}

pub fn ensure(allowed: bool) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("forbidden, you are not allowed".into()))
    }
}

#[cfg(test)]
mod guard_tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "u".into(),
            email: "u@x.com".into(),
            password_hash: String::new(),
            role,
            image_url: String::new(),
            token_version: 1,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn recipe_of(owner: &User) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id: owner.id,
            name: "Pancakes".into(),
            category: "Breakfast".into(),
            image_url: String::new(),
            duration: "20m".into(),
            complexity: "simple".into(),
            affordability: "cheap".into(),
            is_gluten_free: false,
            is_lactose_free: false,
            is_vegan: false,
            ingredients: vec![],
            steps: vec![],
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn owner_may_mutate_and_delete() {
        let owner = user(Role::User);
        let recipe = recipe_of(&owner);
        assert!(can_mutate(&owner, &recipe));
        assert!(can_delete(&owner, &recipe));
    }

    #[test]
    fn stranger_may_do_neither() {
        let owner = user(Role::User);
        let stranger = user(Role::User);
        let recipe = recipe_of(&owner);
        assert!(!can_mutate(&stranger, &recipe));
        assert!(!can_delete(&stranger, &recipe));
        assert!(matches!(ensure(false), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn admin_may_delete_but_not_edit() {
        let owner = user(Role::User);
        let admin = user(Role::Admin);
        let recipe = recipe_of(&owner);
        assert!(!can_mutate(&admin, &recipe));
        assert!(can_delete(&admin, &recipe));
    }
}
