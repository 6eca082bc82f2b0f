use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tiny_http::{Header, Method, Request, Response, ResponseBox, Server};

// TODO: move some of this to a `tiny-http-utils` crate?
pub struct HttpServer {
    url: String,
    server: Arc<Server>,
}

impl HttpServer {
    // Spawn the server
    // |-> Move a handle to a request handler thread
    // |   \-> Each request gets handled on a newly spawned thread
    // \-> Return a server guard that shuts down on `drop()`
    pub fn spawn<S, F>(state: S, handler_fn: F) -> Self
    where
        S: Send + Clone + 'static,
        F: Fn(S, &Request) -> ResponseBox + Send + Clone + Copy + 'static,
    {
        // Bind to the ephemeral port and then get the actual resolved address
        let server = Server::http("127.0.0.1:0").unwrap();
        let ip = server
            .server_addr()
            .to_ip()
            .expect("Provided addr is an ip");
        // We're using an `::http()` server
        let url = format!("http://{ip}");

        let server = Arc::new(server);

        Self::spawn_router(Arc::clone(&server), state, handler_fn);

        Self { url, server }
    }

    fn spawn_router<S, F>(server: Arc<Server>, state: S, handler_fn: F)
    where
        S: Send + Clone + 'static,
        F: Fn(S, &Request) -> ResponseBox + Send + Clone + Copy + 'static,
    {
        thread::spawn(move || {
            for req in server.incoming_requests() {
                let s2 = state.clone();
                thread::spawn(move || {
                    let resp = handler_fn(s2, &req);
                    let _ = req.respond(resp);
                });
            }
            // Time to shutdown now
        });
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        // Unblock the `.incoming_requests()`
        self.server.unblock();
    }
}

#[derive(Clone)]
enum Route {
    Json(String),
    Png(Vec<u8>),
}

#[derive(Default)]
struct State {
    routes: BTreeMap<String, Route>,
    hits: BTreeMap<String, usize>,
}

type SharedState = Arc<RwLock<State>>;

/// An in-process stand-in for the remote catalog, so network behavior can be
/// tested without external services
///
/// Serves card objects under `/cards/<id>` and raw images wherever they were
/// mounted, and counts the GETs each path receives.
pub struct MockCatalog {
    server: HttpServer,
    state: SharedState,
}

impl MockCatalog {
    pub fn spawn() -> Self {
        let state = SharedState::default();
        let server = HttpServer::spawn(Arc::clone(&state), |state, req| {
            if *req.method() != Method::Get {
                return Response::empty(404).boxed();
            }
            let url = req.url().to_owned();
            let mut state = state.write();
            *state.hits.entry(url.clone()).or_default() += 1;
            match state.routes.get(&url) {
                Some(Route::Json(body)) => {
                    let header = Header::from_bytes(b"Content-Type", b"application/json").unwrap();
                    Response::from_string(body.clone()).with_header(header).boxed()
                }
                Some(Route::Png(bytes)) => {
                    let header = Header::from_bytes(b"Content-Type", b"image/png").unwrap();
                    Response::from_data(bytes.clone()).with_header(header).boxed()
                }
                None => Response::empty(404).boxed(),
            }
        });
        Self { server, state }
    }

    /// What `LoaderOptions::catalog_base` should be set to
    pub fn cards_base(&self) -> String {
        format!("{}/cards", self.server.url())
    }

    /// Absolute URL of a card object, for `all_parts` references
    pub fn card_url(&self, id: u64) -> String {
        format!("{}/{id}", self.cards_base())
    }

    pub fn add_card(&self, id: u64, card: serde_json::Value) {
        self.state
            .write()
            .routes
            .insert(format!("/cards/{id}"), Route::Json(card.to_string()));
    }

    /// Mount PNG bytes at `path` and return the absolute URL to embed in card
    /// objects
    pub fn add_image(&self, path: &str, bytes: Vec<u8>) -> String {
        self.state
            .write()
            .routes
            .insert(path.to_owned(), Route::Png(bytes));
        format!("{}{path}", self.server.url())
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.read().hits.get(path).copied().unwrap_or(0)
    }

    pub fn card_hits(&self, id: u64) -> usize {
        self.hits(&format!("/cards/{id}"))
    }

    /// Every GET the server has answered
    pub fn total_hits(&self) -> usize {
        self.state.read().hits.values().sum()
    }
}
