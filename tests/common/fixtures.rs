//! Test fixtures and data factories

use batchops::Entity;
use serde::{Deserialize, Serialize};

/// Test user entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub age: u32,
}

impl Entity for User {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

/// Factory for creating test users
pub struct UserFactory;

impl UserFactory {
    /// Create a user with defaults derived from the id
    pub fn create(id: u64) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            name: format!("User {}", id),
            age: 30,
        }
    }

    /// Users with ids `0..count`
    pub fn many(count: u64) -> Vec<User> {
        (0..count).map(Self::create).collect()
    }

    pub fn with_email(id: u64, email: &str) -> User {
        let mut user = Self::create(id);
        user.email = email.to_string();
        user
    }

    pub fn with_age(id: u64, age: u32) -> User {
        let mut user = Self::create(id);
        user.age = age;
        user
    }
}
