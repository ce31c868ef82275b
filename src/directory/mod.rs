//! Admin SDK Directory API client.
//!
//! One concern: page through `GET /users` for a domain and build the
//! in-memory mapping the scanner and uploader read from.

pub mod error;
pub mod responses;
pub mod session;

use std::collections::HashMap;

use tracing::{debug, info};

pub use self::error::DirectoryError;
use self::responses::UsersPage;
use self::session::AdminSession;

/// Production Admin SDK Directory API root.
pub const DIRECTORY_API_ROOT: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Directory entry kept per user, keyed by lowercased primary email.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub suspended: bool,
    pub is_admin: bool,
}

/// Mapping from lowercased primary email to user summary.
/// Built once by the fetch, read-only afterwards.
pub type DirectoryMapping = HashMap<String, UserSummary>;

pub struct DirectoryClient {
    session: Box<dyn AdminSession>,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(session: Box<dyn AdminSession>, base_url: String) -> Self {
        Self { session, base_url }
    }

    /// Page through the whole user directory for `domain`.
    ///
    /// Every page must carry a `users` field; a page without one fails the
    /// fetch. Later pages overwrite earlier entries that share a lowercased
    /// email, so the last page's record wins. Fetch errors are fatal; there
    /// is no retry and no partial mapping.
    pub async fn fetch_all_users(
        &self,
        domain: &str,
        page_size: u32,
    ) -> Result<DirectoryMapping, DirectoryError> {
        let mut users: DirectoryMapping = HashMap::new();
        let mut page_token = String::new();
        let mut pages = 0u32;

        info!(domain, "Fetching directory users");

        loop {
            let url = self.users_url(domain, page_size, &page_token);
            let response = self.session.get_json(&url).await?;
            let page: UsersPage = serde_json::from_value(response)?;

            let page_users = match page.users {
                Some(u) => u,
                None => return Err(DirectoryError::MissingUsers),
            };

            pages += 1;
            for user in page_users {
                let key = user.primary_email.to_lowercase();
                users.insert(
                    key,
                    UserSummary {
                        id: user.id,
                        email: user.primary_email,
                        name: user.name.full_name.unwrap_or_default(),
                        suspended: user.suspended,
                        is_admin: user.is_admin,
                    },
                );
            }
            debug!(page = pages, total = users.len(), "Fetched directory page");

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = token,
                _ => break,
            }
        }

        info!(total = users.len(), pages, "Directory fetch complete");
        Ok(users)
    }

    /// `pageToken` is always present, empty on the first call.
    fn users_url(&self, domain: &str, page_size: u32, page_token: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("domain", domain)
            .append_pair("maxResults", &page_size.to_string())
            .append_pair("pageToken", page_token)
            .finish();
        format!("{}/users?{}", self.base_url, query)
    }
}
