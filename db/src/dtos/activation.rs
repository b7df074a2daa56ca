pub struct ActivationCreateRequest {
    pub user_id: i64,
    pub phone: String,
    pub name: String,
    pub username: Option<String>,
}

/// Login details staff attach to an activation for their own records.
pub struct CredentialsUpdate {
    pub email: String,
    pub password: String,
}
