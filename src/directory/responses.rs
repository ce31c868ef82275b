use serde::Deserialize;

/// One page of the directory users listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    /// Absent entirely when the API violates the listing contract; an empty
    /// vector when the domain simply has no users on this page.
    #[serde(default)]
    pub users: Option<Vec<DirectoryUser>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A user entry as returned by the Admin SDK; only consumed fields are kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub primary_email: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub full_name: Option<String>,
}
