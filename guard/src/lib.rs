use middleware::secret::GatewaySecretMiddleware;

pub mod middleware {
    pub mod secret;
}

/// Header the chat gateway sends its shared secret in.
pub const SECRET_HEADER: &str = "X-Gateway-Secret";

/// Rejects webhook calls that do not carry the configured gateway secret.
/// With no secret configured every call passes.
pub fn middleware(secret: Option<String>) -> GatewaySecretMiddleware {
    GatewaySecretMiddleware::new(secret)
}
