use actix_web::HttpMessage;
use actix_web::dev::Payload;
use actix_web::web::{self, Bytes};
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use colored::Colorize;
use futures::StreamExt;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{debug, info, warn};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Logs every webhook call: status, method, path, latency and the
/// event kind / user id found in a JSON body.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let method = req.method().to_string();
        let path = req.path().to_string();
        let ip = req
            .connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let started = Instant::now();

            // Copy request body from payload and reconstruct it
            let mut payload = req.take_payload();
            let body_bytes = extract_body(&mut payload).await?;
            let summary = summarize_event(&body_bytes);
            let new_stream: Pin<
                Box<dyn futures::Stream<Item = Result<Bytes, actix_web::error::PayloadError>>>,
            > = futures::stream::once(async move {
                Ok::<Bytes, actix_web::error::PayloadError>(body_bytes)
            })
            .boxed();
            req.set_payload(Payload::from(new_stream));

            let res = srv.call(req).await?;

            let status_code = res.status().as_u16();
            let colored_status = match status_code {
                200..=299 => status_code.to_string().green(),
                300..=399 => status_code.to_string().yellow(),
                400..=499 => status_code.to_string().bright_red(),
                _ => status_code.to_string().red(),
            };
            let colored_method = match method.as_str() {
                "GET" => method.blue(),
                "POST" => method.yellow(),
                _ => method.normal(),
            };
            let elapsed = format!("({}ms)", started.elapsed().as_millis()).bright_black();
            let event = summary
                .as_ref()
                .map(|s| format!("kind={} user_id={}", s.kind, s.user_id))
                .unwrap_or_default()
                .bright_blue();

            if status_code >= 500 {
                warn!(
                    "[{}] {} {} {} {} ip={}",
                    colored_status,
                    colored_method,
                    path,
                    elapsed,
                    event,
                    ip
                );
            } else {
                info!(
                    "[{}] {} {} {} {}",
                    colored_status,
                    colored_method,
                    path.bright_white(),
                    elapsed,
                    event
                );
                debug!("  from {}", ip.bright_cyan());
            }

            Ok(res)
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct EventSummary {
    kind: String,
    user_id: String,
}

/// Pulls the routing fields out of an event body without failing on anything else.
fn summarize_event(body: &[u8]) -> Option<EventSummary> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let kind = value.get("kind")?.as_str()?.to_string();
    let user_id = value
        .get("user_id")
        .map(|id| id.to_string())
        .unwrap_or_else(|| "None".to_string());
    Some(EventSummary { kind, user_id })
}

async fn extract_body(payload: &mut Payload) -> Result<Bytes, Error> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test};

    #[::std::prelude::v1::test]
    fn summary_reads_kind_and_user() {
        let summary = summarize_event(br#"{"kind":"text","user_id":42,"text":"hi"}"#).unwrap();
        assert_eq!(
            summary,
            EventSummary {
                kind: "text".into(),
                user_id: "42".into()
            }
        );
        assert_eq!(summarize_event(b"not json"), None);
        assert_eq!(summarize_event(br#"{"user_id":1}"#), None);
    }

    #[actix_web::test]
    async fn body_is_still_readable_downstream() {
        let app = test::init_service(App::new().wrap(LoggerMiddleware::new()).route(
            "/echo",
            web::post().to(|body: Bytes| async move { HttpResponse::Ok().body(body) }),
        ))
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .set_payload(r#"{"kind":"photo","user_id":1,"file_ref":"f"}"#)
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, Bytes::from_static(br#"{"kind":"photo","user_id":1,"file_ref":"f"}"#));
    }
}
