use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::session::{Session, User, UserRole},
    usecases::{
        contracts::SourceError,
        login::AuthSource,
        register::{Registration, RegistrationSource},
    },
};

use super::client::ApiClient;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUp<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    user_type: UserRole,
    group: Option<&'a str>,
    teacher: Option<&'a str>,
}

impl<'a> From<&'a Registration> for SignUp<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            email: &registration.email,
            password: &registration.password,
            full_name: &registration.full_name,
            user_type: registration.role,
            group: registration.group.as_deref(),
            teacher: registration.teacher.as_deref(),
        }
    }
}

/// Body of both `POST /login` and `POST /register`.
#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: User,
}

#[async_trait]
impl AuthSource for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<Session, SourceError> {
        let response: LoginResponse = self
            .post_json("/login", &Credentials { email, password })
            .await?;

        Ok(Session {
            token: response.token,
            user: response.user,
        })
    }
}

#[async_trait]
impl RegistrationSource for ApiClient {
    async fn register(&self, registration: &Registration) -> Result<Session, SourceError> {
        let response: LoginResponse = self
            .post_json("/register", &SignUp::from(registration))
            .await?;

        Ok(Session {
            token: response.token,
            user: response.user,
        })
    }

    async fn known_groups(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.get_json("/groups", &[]).await?)
    }

    async fn known_teachers(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.get_json("/teachers", &[]).await?)
    }
}
