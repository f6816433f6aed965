use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::uri::Absolute;
use rocket::http::{Header, Method, Status};
use rocket::{Request, Response};

const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Allows the single-page frontend, and local dev servers, to call the API
/// with credentials.
pub struct Cors {
    frontend_url: String,
}

impl Cors {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The configured frontend, or a local dev server on any port.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        if origin == self.frontend_url {
            return true;
        }

        let Ok(uri) = Absolute::parse(origin) else {
            return false;
        };

        matches!(uri.scheme(), "http" | "https")
            && uri
                .authority()
                .is_some_and(|authority| LOCAL_HOSTS.contains(&authority.host()))
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = request.headers().get_one("Origin") else {
            return;
        };

        if !self.is_allowed_origin(origin) {
            tracing::debug!(origin = %origin, "Rejected cross-origin request");
            return;
        }

        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ));
        response.set_header(Header::new("Vary", "Origin"));

        // Preflights never match a route.
        if request.method() == Method::Options && response.status() == Status::NotFound {
            response.set_status(Status::NoContent);
            response.set_sized_body(0, std::io::Cursor::new(""));
        }
    }
}
