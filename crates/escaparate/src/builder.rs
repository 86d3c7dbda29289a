//! Test-data builder for user records.
//!
//! ```ignore
//! let alice = UserBuilder::new().with_name("Alice").with_role("admin").build();
//! assert_eq!(alice.password(), "Password123!");
//! ```
//!
//! The default e-mail embeds the clock reading taken once when the builder
//! is created, so every record built from one builder shares it.

use serde::Serialize;

use crate::clock::{Clock, SystemClock};

/// Default display name
pub const DEFAULT_NAME: &str = "Test User";
/// Default password
pub const DEFAULT_PASSWORD: &str = "Password123!";
/// Default role
pub const DEFAULT_ROLE: &str = "user";

/// An immutable user produced by [`UserBuilder::build`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserRecord {
    name: String,
    email: String,
    password: String,
    role: String,
    active: bool,
}

impl UserRecord {
    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// E-mail address
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Role (`"user"`, `"admin"`, ...)
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Whether the account is active
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }
}

/// Fluent builder for [`UserRecord`]
#[derive(Debug, Clone)]
pub struct UserBuilder {
    name: String,
    email: String,
    password: String,
    role: String,
    active: bool,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder {
    /// Create a builder with defaults, reading the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(&SystemClock)
    }

    /// Create a builder with defaults, reading `clock` once
    #[must_use]
    pub fn with_clock(clock: &dyn Clock) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            email: format!("test-{}@example.com", clock.now_ms()),
            password: DEFAULT_PASSWORD.to_string(),
            role: DEFAULT_ROLE.to_string(),
            active: true,
        }
    }

    /// Builder preset for an administrator
    #[must_use]
    pub fn admin() -> Self {
        Self::admin_with_clock(&SystemClock)
    }

    /// Builder preset for an administrator, reading `clock`
    #[must_use]
    pub fn admin_with_clock(clock: &dyn Clock) -> Self {
        let mut builder = Self::with_clock(clock);
        builder.with_role("admin").with_name("Admin User");
        builder
    }

    /// Builder preset for a regular user
    #[must_use]
    pub fn regular() -> Self {
        Self::regular_with_clock(&SystemClock)
    }

    /// Builder preset for a regular user, reading `clock`
    #[must_use]
    pub fn regular_with_clock(clock: &dyn Clock) -> Self {
        let mut builder = Self::with_clock(clock);
        builder.with_role(DEFAULT_ROLE).with_name("Regular User");
        builder
    }

    /// Set the display name
    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Set the e-mail address
    pub fn with_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.email = email.into();
        self
    }

    /// Set the password
    pub fn with_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = password.into();
        self
    }

    /// Set the role
    pub fn with_role(&mut self, role: impl Into<String>) -> &mut Self {
        self.role = role.into();
        self
    }

    /// Set whether the account is active
    pub fn with_active_status(&mut self, active: bool) -> &mut Self {
        self.active = active;
        self
    }

    /// Snapshot the current state as a new record
    #[must_use]
    pub fn build(&self) -> UserRecord {
        UserRecord {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            role: self.role.clone(),
            active: self.active,
        }
    }
}
