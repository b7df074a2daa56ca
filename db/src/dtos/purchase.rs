pub struct PurchaseCreateRequest {
    pub user_id: i64,
    pub phone: String,
    pub name: String,
    pub username: Option<String>,
}
