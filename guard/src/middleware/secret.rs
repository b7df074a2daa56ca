use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::{error::AppError, misc::constant_time_eq};
use futures::future::{Ready, ok};

use crate::SECRET_HEADER;

pub struct GatewaySecretMiddleware {
    secret: Option<Rc<String>>,
}

impl GatewaySecretMiddleware {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(Rc::new),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GatewaySecretMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = GatewaySecretMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(GatewaySecretMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        })
    }
}

pub struct GatewaySecretMiddlewareService<S> {
    service: Rc<S>,
    secret: Option<Rc<String>>,
}

impl<S, B> Service<ServiceRequest> for GatewaySecretMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorized = match &self.secret {
            None => true,
            Some(_) if req.path().ends_with("/health") => true,
            Some(secret) => req
                .headers()
                .get(SECRET_HEADER)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|presented| {
                    constant_time_eq(presented.as_bytes(), secret.as_bytes())
                }),
        };

        if !authorized {
            log::warn!("Rejected call to {} without a valid gateway secret", req.path());
            return Box::pin(async move {
                Ok(req.error_response(AppError::Unauthorized(
                    "Missing or invalid gateway secret".to_string(),
                )))
            });
        }

        let srv = Rc::clone(&self.service);
        Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn status_for(secret: Option<&str>, header: Option<&str>, uri: &str) -> StatusCode {
        let app = test::init_service(
            App::new()
                .wrap(GatewaySecretMiddleware::new(secret.map(str::to_string)))
                .route("/api/events", web::post().to(HttpResponse::Ok))
                .route("/api/health", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let mut req = if uri.ends_with("health") {
            test::TestRequest::get().uri(uri)
        } else {
            test::TestRequest::post().uri(uri)
        };
        if let Some(header) = header {
            req = req.insert_header((SECRET_HEADER, header));
        }
        test::call_service(&app, req.to_request()).await.status()
    }

    #[actix_web::test]
    async fn open_without_configured_secret() {
        assert_eq!(status_for(None, None, "/api/events").await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn checks_presented_secret() {
        assert_eq!(
            status_for(Some("s3cret"), Some("s3cret"), "/api/events").await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(Some("s3cret"), Some("wrong"), "/api/events").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(Some("s3cret"), None, "/api/events").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn health_is_always_open() {
        assert_eq!(
            status_for(Some("s3cret"), None, "/api/health").await,
            StatusCode::OK
        );
    }
}
