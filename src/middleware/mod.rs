/// HTTP middleware utilities
///
/// Authentication happens at the gateway; requests arrive with the
/// caller's identity in the X-User-Id header. The identity middleware
/// lifts that header into request extensions so handlers can take a
/// `UserId` argument.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserId(pub Uuid);

pub struct IdentityMiddleware;

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("X-User-Id")
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| ErrorUnauthorized("Missing X-User-Id header"))?;

            let user_id = Uuid::parse_str(header)
                .map_err(|_| ErrorUnauthorized("Invalid user ID"))?;

            req.extensions_mut().insert(UserId(user_id));

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("User ID missing")),
        )
    }
}

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await?;
            let status = res.status().as_u16().to_string();
            let duration = start.elapsed().as_secs_f64();

            crate::metrics::HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &path, &status])
                .inc();
            crate::metrics::HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[&method, &path, &status])
                .observe(duration);

            tracing::debug!(%method, %path, %status, duration, "request completed");
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    async fn whoami(user: UserId) -> HttpResponse {
        HttpResponse::Ok().body(user.0.to_string())
    }

    #[actix_rt::test]
    async fn identity_header_reaches_the_extractor() {
        let app = test::init_service(
            App::new()
                .wrap(IdentityMiddleware)
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let user_id = Uuid::new_v4();
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("X-User-Id", user_id.to_string()))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());

        let body = test::read_body(res).await;
        assert_eq!(&body[..], user_id.to_string().as_bytes());
    }

    #[actix_rt::test]
    async fn missing_identity_header_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .wrap(IdentityMiddleware)
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let err = test::try_call_service(&app, req)
            .await
            .expect_err("request without identity must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn malformed_identity_header_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .wrap(IdentityMiddleware)
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("X-User-Id", "not-a-uuid"))
            .to_request();
        let err = test::try_call_service(&app, req)
            .await
            .expect_err("request with a bad identity must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn request_metrics_recorded_on_completion() {
        let app = test::init_service(
            App::new()
                .wrap(MetricsMiddleware)
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let labels = ["GET", "/ping", "200"];
        let before = crate::metrics::HTTP_REQUESTS_TOTAL
            .with_label_values(&labels)
            .get();

        let req = test::TestRequest::get().uri("/ping").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());

        assert_eq!(
            crate::metrics::HTTP_REQUESTS_TOTAL
                .with_label_values(&labels)
                .get(),
            before + 1
        );
    }
}
