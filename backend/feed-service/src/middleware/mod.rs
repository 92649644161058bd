/// HTTP middleware for feed-service
///
/// Authentication happens at the gateway, which forwards the signed-in user
/// as the `x-user-id` header. Requests without the header are anonymous.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

pub const VIEWER_HEADER: &str = "x-user-id";

/// Signed-in viewer stored in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerId(pub Uuid);

/// Reads the gateway viewer header into request extensions.
///
/// A header that is present but not a UUID is rejected with 401 rather than
/// silently treated as anonymous.
pub struct ViewerIdentity;

impl<S, B> Transform<S, ServiceRequest> for ViewerIdentity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ViewerIdentityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ViewerIdentityService {
            service: Rc::new(service),
        }))
    }
}

pub struct ViewerIdentityService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ViewerIdentityService<S>
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
            if let Some(viewer_id) = parse_viewer_header(req.request())? {
                req.extensions_mut().insert(ViewerId(viewer_id));
            }
            service.call(req).await
        })
    }
}

fn parse_viewer_header(req: &HttpRequest) -> Result<Option<Uuid>, Error> {
    let Some(raw) = req.headers().get(VIEWER_HEADER) else {
        return Ok(None);
    };

    let value = raw.to_str().map_err(|_| invalid_viewer_header())?;

    Uuid::parse_str(value.trim()).map(Some).map_err(|_| {
        debug!(header = VIEWER_HEADER, "Rejecting malformed viewer id");
        invalid_viewer_header()
    })
}

fn invalid_viewer_header() -> Error {
    AppError::Unauthorized("Invalid viewer header".into()).into()
}

impl FromRequest for ViewerId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<ViewerId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("Viewer identity missing".into()).into()),
        )
    }
}
