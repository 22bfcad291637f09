//! Identity directory client.

use crate::error::IdentityError;
use crate::http::{expect_success, handle_response};
use crate::types::{ListUsersResponse, UpdateAttributesRequest, UserAttribute, UserSummary};
use crate::IdentityDirectory;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};
use urlencoding::encode;

/// HTTP client for the user directory of the identity provider.
///
/// The API token is stored using `SecretString` to prevent accidental
/// exposure in logs or debug output.
#[derive(Clone)]
pub struct HttpIdentityDirectory {
    client: Client,
    base_url: String,
    api_token: SecretString,
    user_pool_id: String,
}

impl HttpIdentityDirectory {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        user_pool_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_token: SecretString::new(api_token.into()),
            user_pool_id: user_pool_id.into(),
        })
    }

    /// User pool searched by `list_by_phone`.
    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token.expose_secret())
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    #[instrument(skip(self))]
    async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<UserSummary>, IdentityError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/pools/{}/users",
                self.base_url,
                encode(&self.user_pool_id)
            ))
            .query(&[("phone_number", phone_number)])
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let list: ListUsersResponse = handle_response(response).await?;
        debug!("Found {} accounts", list.users.len());
        Ok(list.users)
    }

    #[instrument(skip(self, value))]
    async fn set_attribute(
        &self,
        user_pool_id: &str,
        username: &str,
        name: &str,
        value: &str,
    ) -> Result<(), IdentityError> {
        let request = UpdateAttributesRequest {
            attributes: vec![UserAttribute { name, value }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/pools/{}/users/{}/attributes",
                self.base_url,
                encode(user_pool_id),
                encode(username)
            ))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await?;

        expect_success(response).await?;
        debug!("Attribute updated");
        Ok(())
    }
}
