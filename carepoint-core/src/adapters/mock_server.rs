//! Mock billing and Firebase server for testing
//!
//! Serves both collaborators from one listener so adapters can be exercised
//! over real HTTP:
//! - Billing: GET /plans, GET /clinics/{id}/billing, GET /clinics/{id}/limits,
//!   POST /clinics/{id}/checkout, POST /clinics/{id}/subscription/cancel,
//!   POST /clinics/{id}/payment-method (bearer key must start with `test_`)
//! - Identity Toolkit: POST /v1/accounts:{signInWithPassword|signUp|sendOobCode|update}
//!   (`key` query parameter must start with `test_`)
//! - Firestore: GET/PATCH /v1/projects/{p}/databases/(default)/documents/users/{uid}

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};

/// Account the mock identity service knows about from the start
pub const KNOWN_EMAIL: &str = "staff@clinic.com";
pub const KNOWN_PASSWORD: &str = "secret123";
pub const KNOWN_UID: &str = "uid-staff";

/// Mock server for tests
pub struct MockServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Scenario switches
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every billing call with 429
    pub rate_limit: bool,
    /// Report the clinic as having no access
    pub no_access: bool,
    /// Do not seed a profile document for the known account
    pub missing_profile: bool,
}

struct MockState {
    config: MockConfig,
    profiles: Mutex<HashMap<String, JsonValue>>,
    next_uid: AtomicUsize,
}

struct Request {
    method: String,
    path: String,
    query: String,
    headers: String,
    body: String,
}

impl MockServer {
    /// Start on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let mut profiles = HashMap::new();
        if !config.missing_profile {
            profiles.insert(
                KNOWN_UID.to_string(),
                json!({
                    "fields": {
                        "email": { "stringValue": KNOWN_EMAIL },
                        "name": { "stringValue": "Dr. Remote" },
                        "role": { "stringValue": "doctor" },
                        "department": { "stringValue": "Cardiology" },
                        "isActive": { "booleanValue": true }
                    }
                }),
            );
        }
        let state = Arc::new(MockState {
            config,
            profiles: Mutex::new(profiles),
            next_uid: AtomicUsize::new(1),
        });

        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let headers = head.to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.to_string(), String::new()),
    };

    Some(Request {
        method,
        path,
        query,
        headers,
        body: String::from_utf8_lossy(&data[header_end..]).to_string(),
    })
}

fn handle_connection(mut stream: TcpStream, state: &MockState) {
    let _ = stream.set_nonblocking(false);
    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    };

    let (status, body) = if request.path.starts_with("/v1/accounts:") {
        identity_route(&request, state)
    } else if request.path.starts_with("/v1/projects/") {
        firestore_route(&request, state)
    } else if request.path == "/" {
        (404, json!({ "error": { "message": "NOT_FOUND" } }))
    } else {
        billing_route(&request, state)
    };

    let text = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        _ => "Error",
    };
    send_response(&mut stream, status, text, &body.to_string());
}

fn firebase_error(code: &str) -> (u16, JsonValue) {
    (400, json!({ "error": { "code": 400, "message": code } }))
}

fn identity_route(request: &Request, state: &MockState) -> (u16, JsonValue) {
    if !request.query.split('&').any(|p| p.starts_with("key=test_")) {
        return firebase_error("API_KEY_INVALID");
    }
    let body: JsonValue = serde_json::from_str(&request.body).unwrap_or(JsonValue::Null);
    let email = body["email"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");

    let account = |uid: &str, email: &str| {
        json!({
            "localId": uid,
            "email": email,
            "idToken": format!("id-token-{}", uid),
            "refreshToken": format!("refresh-{}", uid)
        })
    };

    match request.path.trim_start_matches("/v1/accounts:") {
        "signInWithPassword" => {
            if email.eq_ignore_ascii_case(KNOWN_EMAIL) && password == KNOWN_PASSWORD {
                (200, account(KNOWN_UID, KNOWN_EMAIL))
            } else {
                firebase_error("INVALID_LOGIN_CREDENTIALS")
            }
        }
        "signUp" => {
            if email.eq_ignore_ascii_case(KNOWN_EMAIL) {
                firebase_error("EMAIL_EXISTS")
            } else if password.len() < 6 {
                firebase_error("WEAK_PASSWORD : Password should be at least 6 characters")
            } else {
                let n = state.next_uid.fetch_add(1, Ordering::SeqCst);
                (200, account(&format!("uid-new-{}", n), email))
            }
        }
        "sendOobCode" => (200, json!({ "email": email })),
        "update" => match body["idToken"].as_str() {
            Some(token) if token.starts_with("id-token-") => {
                let uid = token.trim_start_matches("id-token-");
                (200, account(uid, KNOWN_EMAIL))
            }
            _ => firebase_error("INVALID_ID_TOKEN"),
        },
        _ => (404, json!({ "error": { "message": "NOT_FOUND" } })),
    }
}

fn firestore_route(request: &Request, state: &MockState) -> (u16, JsonValue) {
    if !request.headers.contains("authorization: bearer id-token-") {
        return (401, json!({ "error": { "message": "UNAUTHENTICATED" } }));
    }
    let Some(uid) = request.path.rsplit('/').next().map(str::to_string) else {
        return (404, json!({ "error": { "message": "NOT_FOUND" } }));
    };

    let mut profiles = match state.profiles.lock() {
        Ok(p) => p,
        Err(poisoned) => poisoned.into_inner(),
    };
    match request.method.as_str() {
        "GET" => match profiles.get(&uid) {
            Some(doc) => (200, doc.clone()),
            None => (404, json!({ "error": { "message": "NOT_FOUND" } })),
        },
        "PATCH" => {
            let doc: JsonValue = serde_json::from_str(&request.body).unwrap_or(JsonValue::Null);
            profiles.insert(uid, doc.clone());
            (200, doc)
        }
        _ => (405, json!({ "error": "Method not allowed" })),
    }
}

fn billing_route(request: &Request, state: &MockState) -> (u16, JsonValue) {
    if !request.headers.contains("authorization: bearer test_") {
        return (401, json!({ "error": "Invalid API key" }));
    }
    if state.config.rate_limit {
        return (429, json!({ "error": "Rate limit exceeded" }));
    }

    let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["plans"]) => (200, json!({ "plans": mock_plans() })),
        ("GET", ["clinics", clinic, "limits"]) => (200, mock_limits(clinic, &state.config)),
        ("GET", ["clinics", clinic, "billing"]) => {
            let limits = mock_limits(clinic, &state.config);
            (
                200,
                json!({
                    "clinicId": clinic,
                    "plan": mock_plans()[0],
                    "subscriptionStatus": limits["subscriptionStatus"],
                    "trialEndsAt": limits["trialEndsAt"],
                    "currentUsage": limits["currentUsage"],
                    "planLimits": limits["planLimits"],
                    "invoices": []
                }),
            )
        }
        ("POST", ["clinics", clinic, "checkout"]) => {
            let body: JsonValue = serde_json::from_str(&request.body).unwrap_or(JsonValue::Null);
            let plan = body["planId"].as_str().unwrap_or("unknown");
            (
                200,
                json!({
                    "sessionId": format!("cs_{}_{}", clinic, plan),
                    "url": format!("https://checkout.example.com/{}/{}", clinic, plan)
                }),
            )
        }
        ("POST", ["clinics", _, "subscription", "cancel"]) => (
            200,
            json!({
                "success": true,
                "message": "Subscription will end at the close of the billing period",
                "effectiveAt": (Utc::now() + Duration::days(30)).to_rfc3339()
            }),
        ),
        ("POST", ["clinics", clinic, "payment-method"]) => (
            200,
            json!({ "url": format!("https://billing.example.com/{}/payment", clinic) }),
        ),
        _ => (404, json!({ "error": "Endpoint not found" })),
    }
}

fn mock_plans() -> Vec<JsonValue> {
    vec![
        json!({
            "id": "basic", "name": "Basic", "price": "49.00", "interval": "month",
            "limits": { "max_users": 10, "max_patients": 500 },
            "features": { "reports": false }
        }),
        json!({
            "id": "professional", "name": "Professional", "price": "149.00", "interval": "month",
            "limits": { "max_users": 50, "max_patients": 5000 },
            "features": { "reports": true }, "popular": true
        }),
        json!({
            "id": "enterprise", "name": "Enterprise", "price": "499.00", "interval": "month",
            "limits": { "max_users": -1, "max_patients": -1 },
            "features": { "reports": true, "api_access": true }
        }),
    ]
}

fn mock_limits(_clinic: &str, config: &MockConfig) -> JsonValue {
    json!({
        "hasAccess": !config.no_access,
        "canAddUsers": !config.no_access,
        "canAddPatients": !config.no_access,
        "subscriptionStatus": if config.no_access { "expired" } else { "trial" },
        "trialEndsAt": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "currentUsage": { "users": 3, "patients": 42 },
        "planLimits": { "max_users": 10, "max_patients": 500 },
        "features": { "reports": false }
    })
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
