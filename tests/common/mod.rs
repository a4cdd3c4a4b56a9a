//! Shared test fixtures: logging, a fake borg, and a fake Pushgateway.

#![allow(dead_code)]

use async_once::AsyncOnce;
use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    fs,
    os::unix::fs::PermissionsExt,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    header::HeaderMap,
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;
use tokio::net::TcpListener;

use borg_push::Config;

lazy_static! {
    static ref TEST_INIT: AsyncOnce<()> = AsyncOnce::new(async {
        let _ = env_logger::builder().is_test(true).try_init();
        log::info!("TEST_INIT starting");
    });

    // Tests that write and then execute a script are run one at a time,
    // so that no other test forks while a script is still open for
    // writing.
    pub static ref SERIAL: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

pub async fn init() {
    TEST_INIT.get().await;
}

pub static TWO_ARCHIVES: &'static str = r#"{
    "archives": [
        {"archive": "automatic-a", "name": "automatic-a", "time": "2023-01-01T00:00:00+00:00"},
        {"archive": "automatic-b", "name": "automatic-b", "time": "2023-06-01T00:00:00+00:00"}
    ],
    "repository": {"location": "/repo"}
}"#;

/// A shell script standing in for borg.  Every invocation is logged, one
/// line per call, with the credential variables it was given.
pub struct FakeBorg {
    dir: TempDir,
    pub program: String,
    log: PathBuf,
}

impl FakeBorg {
    pub fn new(init_status: i32, create_status: i32, listing: &str) -> FakeBorg {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let listing_file = dir.path().join("listing.json");
        fs::write(&listing_file, listing).unwrap();

        let script = format!(r#"#!/bin/sh
echo "$1 pass=${{BORG_PASSPHRASE:-}} clear=${{BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK:-}} args=$*" >> '{log}'
case "$1" in
    init) exit {init} ;;
    create) exit {create} ;;
    list) cat '{listing}' ;;
esac
exit 0
"#,
            log = log.display(),
            init = init_status,
            create = create_status,
            listing = listing_file.display());

        let program = dir.path().join("borg");
        fs::write(&program, script).unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

        FakeBorg {
            program: program.display().to_string(),
            dir,
            log,
        }
    }

    /// Every call made, in order.
    pub fn calls(&self) -> Vec<String> {
        match fs::read_to_string(&self.log) {
            Ok(text) => text.lines().map(String::from).collect(),
            Err(_) => vec![],
        }
    }

    /// Just the subcommands called, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| call.split_whitespace().next().unwrap_or("").to_string())
            .collect()
    }
}

/// A repository and production tree with known sizes.
pub struct Trees {
    pub repo: TempDir,
    pub prod: TempDir,
}

impl Trees {
    pub fn new() -> Trees {
        let repo = tempfile::tempdir().unwrap();
        fs::write(repo.path().join("data"), vec![0u8; 100]).unwrap();

        let prod = tempfile::tempdir().unwrap();
        fs::create_dir(prod.path().join("sub")).unwrap();
        fs::write(prod.path().join("sub").join("file"), vec![0u8; 250]).unwrap();
        std::os::unix::fs::symlink(prod.path().join("sub").join("file"),
            prod.path().join("link")).unwrap();

        Trees { repo, prod }
    }
}

/// Build a configuration from the given variables.
pub fn config(borg: &FakeBorg, vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut config = Config::from_lookup(|name| vars.get(name).cloned());
    config.borg = borg.program.clone();
    config
}

/// A request received by the [`FakeGateway`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body_lines(&self) -> Vec<&str> {
        self.body.lines().collect()
    }
}

/// An HTTP server that records each request, and answers with a fixed
/// status.
pub struct FakeGateway {
    pub address: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub async fn start(status: u16) -> FakeGateway {
        let status = StatusCode::from_u16(status).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(vec![]));
        let connections = Arc::new(AtomicUsize::new(0));

        let reqs = requests.clone();
        let conns = connections.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                conns.fetch_add(1, Ordering::SeqCst);
                let io = TokioIo::new(stream);
                let reqs = reqs.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let reqs = reqs.clone();
                        async move { record(req, &reqs, status).await }
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        log::error!("Fake gateway connection error: {}", e);
                    }
                });
            }
        });

        FakeGateway { address, requests, connections }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn record(
    req: Request<Incoming>,
    requests: &Mutex<Vec<Recorded>>,
    status: StatusCode,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    requests.lock().unwrap().push(Recorded {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    Ok(response)
}
