use std::{
    sync::{Mutex, OnceLock, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use digest_auth::{AuthContext, WwwAuthenticateHeader};
use reqwest::{
    Url,
    blocking::{Client, Response},
    header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vapix::{HttpMethod, VapixError, VapixTransport, unwrap_rpc_response};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    None,
    Basic,
    #[default]
    Digest,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub scheme: String,
    pub timeout_secs: u64,
    pub auth: AuthScheme,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::from("192.168.0.90"),
            user: String::from("root"),
            password: String::new(),
            scheme: String::from("http"),
            timeout_secs: 5,
            auth: AuthScheme::Digest,
        }
    }
}

impl From<reqwest::Error> for VapixError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VapixError::Timeout
        } else if err.is_connect() {
            VapixError::Connection(err.to_string())
        } else if err.is_decode() {
            VapixError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            VapixError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            VapixError::Request(err.to_string())
        }
    }
}

enum Body {
    Empty,
    Json(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// Blocking HTTP session against one camera's `/axis-cgi` tree.
///
/// The underlying client is built on first use, so a session can be created
/// anywhere and handed to the thread that will drive it. Under digest auth
/// the last challenge is kept and answered up front on later requests; the
/// camera is only asked again after it rejects one.
#[derive(Debug)]
pub struct VapixSession {
    base_url: Url,
    config: SessionConfig,
    client: OnceLock<Client>,
    challenge: Mutex<Option<WwwAuthenticateHeader>>,
}

impl VapixSession {
    pub fn new(config: SessionConfig) -> Result<Self, VapixError> {
        let base_url = Url::parse(&format!("{}://{}/axis-cgi/", config.scheme, config.host))
            .map_err(|e| VapixError::Connection(format!("Invalid camera address: {}", e)))?;

        Ok(Self {
            base_url,
            config,
            client: OnceLock::new(),
            challenge: Mutex::new(None),
        })
    }

    fn client(&self) -> Result<&Client, VapixError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        Ok(self.client.get_or_init(|| client))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    fn endpoint(&self, path: &str) -> Result<Url, VapixError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| VapixError::Connection(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn send(
        &self,
        client: &Client,
        method: HttpMethod,
        url: &Url,
        body: &Body,
        authorization: Option<&str>,
    ) -> Result<Response, VapixError> {
        let builder = match method {
            HttpMethod::Get => client.get(url.clone()),
            HttpMethod::Post => client.post(url.clone()),
        };

        let builder = match body {
            Body::Empty => builder,
            Body::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            Body::Form(params) => builder.form(params),
        };

        let builder = match (self.config.auth, authorization) {
            (AuthScheme::Basic, _) => {
                builder.basic_auth(&self.config.user, Some(&self.config.password))
            }
            (AuthScheme::Digest, Some(authorization)) => {
                builder.header(AUTHORIZATION, authorization)
            }
            _ => builder,
        };

        Ok(builder.send()?)
    }

    fn answer_challenge(
        &self,
        prompt: &mut WwwAuthenticateHeader,
        method: HttpMethod,
        url: &Url,
        body: &Body,
    ) -> Result<String, VapixError> {
        let uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let context = match (method, body) {
            (HttpMethod::Get, _) => AuthContext::new(
                self.config.user.as_str(),
                self.config.password.as_str(),
                uri.as_str(),
            ),
            (HttpMethod::Post, Body::Json(bytes)) => AuthContext::new_post(
                self.config.user.as_str(),
                self.config.password.as_str(),
                uri.as_str(),
                Some(bytes.as_slice()),
            ),
            (HttpMethod::Post, _) => AuthContext::new_post(
                self.config.user.as_str(),
                self.config.password.as_str(),
                uri.as_str(),
                None::<&[u8]>,
            ),
        };

        // Advances the nonce count kept in the prompt.
        let answer = prompt
            .respond(&context)
            .map_err(|e| VapixError::Auth(e.to_string()))?;

        Ok(answer.to_header_string())
    }

    /// Authorization for the next request from the last accepted challenge.
    fn cached_authorization(
        &self,
        method: HttpMethod,
        url: &Url,
        body: &Body,
    ) -> Result<Option<String>, VapixError> {
        if self.config.auth != AuthScheme::Digest {
            return Ok(None);
        }

        let mut challenge = self.challenge.lock().unwrap_or_else(PoisonError::into_inner);
        match challenge.as_mut() {
            Some(prompt) => self.answer_challenge(prompt, method, url, body).map(Some),
            None => Ok(None),
        }
    }

    /// Parses a fresh challenge from a 401, keeps it and answers it.
    fn accept_challenge(
        &self,
        response: &Response,
        method: HttpMethod,
        url: &Url,
        body: &Body,
    ) -> Result<String, VapixError> {
        let header = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| VapixError::Auth("Missing digest challenge".to_string()))?;

        let mut prompt =
            digest_auth::parse(header).map_err(|e| VapixError::Auth(e.to_string()))?;
        let authorization = self.answer_challenge(&mut prompt, method, url, body)?;

        *self.challenge.lock().unwrap_or_else(PoisonError::into_inner) = Some(prompt);

        Ok(authorization)
    }

    fn execute(&self, method: HttpMethod, url: Url, body: Body) -> Result<Response, VapixError> {
        tracing::debug!(url = %url, method = %method, "Sending VAPIX request");

        let client = self.client()?;
        let authorization = self.cached_authorization(method, &url, &body)?;
        let mut response = self.send(client, method, &url, &body, authorization.as_deref())?;

        if response.status() == StatusCode::UNAUTHORIZED
            && self.config.auth == AuthScheme::Digest
        {
            tracing::debug!(url = %url, "Answering digest challenge");
            let authorization = self.accept_challenge(&response, method, &url, &body)?;
            response = self.send(client, method, &url, &body, Some(&authorization))?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "VAPIX request rejected: unauthorized");
            return Err(VapixError::Auth(format!(
                "Camera rejected credentials for user '{}'",
                self.config.user
            )));
        }

        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(url = %url, status = %status, "VAPIX request failed");
            return Err(VapixError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

/// Arguments every legacy CGI request carries. Caller values override them.
pub fn legacy_arguments(params: &[(String, String)], timestamp: u64) -> Vec<(String, String)> {
    let mut args = vec![
        ("camera".to_string(), "1".to_string()),
        ("html".to_string(), "no".to_string()),
        ("timestamp".to_string(), timestamp.to_string()),
    ];

    for (key, value) in params {
        match args.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => args.push((key.clone(), value.clone())),
        }
    }

    args
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl VapixTransport for VapixSession {
    fn send_json(
        &self,
        path: &str,
        method: HttpMethod,
        payload: &Value,
    ) -> Result<Value, VapixError> {
        let url = self.endpoint(path)?;
        let bytes = serde_json::to_vec(payload).map_err(|e| VapixError::Parse(e.to_string()))?;

        let response = self.execute(method, url, Body::Json(bytes))?;
        let text = response.text()?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| VapixError::Parse(e.to_string()))?;

        unwrap_rpc_response(body)
    }

    fn send_query(
        &self,
        path: &str,
        method: HttpMethod,
        params: &[(String, String)],
    ) -> Result<String, VapixError> {
        let mut url = self.endpoint(path)?;
        let args = legacy_arguments(params, unix_timestamp());

        let body = match method {
            HttpMethod::Get => {
                url.query_pairs_mut().extend_pairs(args.iter());
                Body::Empty
            }
            HttpMethod::Post => Body::Form(args),
        };

        let response = self.execute(method, url, body)?;
        Ok(response.text()?)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        sync::Arc,
        thread,
    };

    use serde_json::json;

    use super::*;

    struct Recorded {
        head: String,
        body: String,
    }

    impl Recorded {
        fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        fn header(&self, name: &str) -> Option<&str> {
            self.head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name).then(|| value.trim())
            })
        }
    }

    type Requests = Arc<Mutex<Vec<Recorded>>>;

    fn read_request(stream: &TcpStream) -> Recorded {
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }

        let length = head
            .lines()
            .skip(1)
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);

        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();

        Recorded {
            head,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    fn reply(status: &str, headers: &[&str], body: &str) -> String {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            body.len()
        );
        for header in headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    /// Serves one request per connection on a local port, answering with
    /// `respond` and recording what was received.
    fn fake_camera<F>(respond: F) -> (String, Requests)
    where
        F: Fn(&Recorded) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        let requests = Requests::default();
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let request = read_request(&stream);
                let answer = respond(&request);
                log.lock().unwrap().push(request);
                let _ = stream.write_all(answer.as_bytes());
            }
        });

        (host, requests)
    }

    fn session(host: &str, auth: AuthScheme) -> VapixSession {
        VapixSession::new(SessionConfig {
            host: host.to_string(),
            password: "secret".to_string(),
            auth,
            ..Default::default()
        })
        .unwrap()
    }

    fn digest_camera() -> (String, Requests) {
        fake_camera(|request| {
            let authorized = request
                .header("authorization")
                .is_some_and(|value| value.starts_with("Digest "));
            if authorized {
                reply("200 OK", &["Content-Type: application/json"], "{\"data\":{}}")
            } else {
                reply(
                    "401 Unauthorized",
                    &[r#"WWW-Authenticate: Digest realm="AXIS_0123", nonce="a1b2c3", qop="auth""#],
                    "",
                )
            }
        })
    }

    #[test]
    fn json_request_is_posted_and_decoded() {
        let (host, requests) = fake_camera(|_| {
            reply(
                "200 OK",
                &["Content-Type: application/json"],
                r#"{"apiVersion":"1.2","data":{"optics":[]}}"#,
            )
        });
        let payload = json!({"apiVersion": "1.2", "method": "getOptics"});

        let body = session(&host, AuthScheme::None)
            .send_json("opticscontrol.cgi", HttpMethod::Post, &payload)
            .unwrap();

        assert_eq!(body["data"], json!({"optics": []}));
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .request_line()
            .starts_with("POST /axis-cgi/opticscontrol.cgi "));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::from_str::<Value>(&requests[0].body).unwrap(),
            payload
        );
    }

    #[test]
    fn error_member_in_body_is_rpc_error() {
        let (host, _requests) = fake_camera(|_| {
            reply(
                "200 OK",
                &["Content-Type: application/json"],
                r#"{"apiVersion":"1.2","error":{"code":2104,"message":"Invalid parameter"}}"#,
            )
        });

        let err = session(&host, AuthScheme::None)
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({}))
            .unwrap_err();

        assert!(matches!(err, VapixError::Rpc { .. }));
        assert_eq!(err.code(), Some(2104));
    }

    #[test]
    fn non_success_status_is_http_error() {
        let (host, _requests) = fake_camera(|_| reply("500 Internal Server Error", &[], "Internal"));

        let err = session(&host, AuthScheme::None)
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({}))
            .unwrap_err();

        match err {
            VapixError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn redirect_loop_reports_no_status_code() {
        let (host, _requests) = fake_camera(|_| {
            reply(
                "302 Found",
                &["Location: /axis-cgi/opticscontrol.cgi"],
                "",
            )
        });

        let err = session(&host, AuthScheme::None)
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({}))
            .unwrap_err();

        assert!(matches!(err, VapixError::Request(_)), "{err:?}");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn get_query_carries_legacy_arguments() {
        let (host, requests) = fake_camera(|_| reply("200 OK", &[], "pan=1\ntilt=2\nzoom=3\n"));

        let text = session(&host, AuthScheme::None)
            .send_query("com/ptz.cgi", HttpMethod::Get, &[pair("query", "position")])
            .unwrap();

        assert_eq!(text, "pan=1\ntilt=2\nzoom=3\n");
        let requests = requests.lock().unwrap();
        let line = requests[0].request_line();
        assert!(
            line.starts_with("GET /axis-cgi/com/ptz.cgi?camera=1&html=no&timestamp="),
            "{line}"
        );
        assert!(line.contains("&query=position "), "{line}");
        assert!(requests[0].body.is_empty());
    }

    #[test]
    fn post_query_is_form_encoded() {
        let (host, requests) = fake_camera(|_| reply("200 OK", &[], ""));

        session(&host, AuthScheme::None)
            .send_query(
                "com/ptz.cgi",
                HttpMethod::Post,
                &[pair("move", "home"), pair("speed", "100")],
            )
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].request_line(), "POST /axis-cgi/com/ptz.cgi HTTP/1.1");
        assert_eq!(
            requests[0].header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert!(requests[0].body.starts_with("camera=1&html=no&timestamp="));
        assert!(requests[0].body.ends_with("&move=home&speed=100"));
    }

    #[test]
    fn digest_challenge_is_answered_once_and_reused() {
        let (host, requests) = digest_camera();
        let session = session(&host, AuthScheme::Digest);

        session
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({"method": "getOptics"}))
            .unwrap();
        assert_eq!(requests.lock().unwrap().len(), 2);

        session
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({"method": "setFocus"}))
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].header("authorization").is_none());

        let first = requests[1].header("authorization").unwrap();
        assert!(first.contains(r#"username="root""#), "{first}");
        assert!(first.contains(r#"uri="/axis-cgi/opticscontrol.cgi""#), "{first}");
        assert!(first.contains("nc=00000001"), "{first}");

        let second = requests[2].header("authorization").unwrap();
        assert!(second.contains("nc=00000002"), "{second}");
    }

    #[test]
    fn rejected_digest_answer_is_auth_error() {
        let (host, requests) = fake_camera(|_| {
            reply(
                "401 Unauthorized",
                &[r#"WWW-Authenticate: Digest realm="AXIS_0123", nonce="a1b2c3", qop="auth""#],
                "",
            )
        });

        let err = session(&host, AuthScheme::Digest)
            .send_json("opticscontrol.cgi", HttpMethod::Post, &json!({}))
            .unwrap_err();

        assert!(matches!(err, VapixError::Auth(_)));
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn basic_auth_sends_credentials_up_front() {
        let (host, requests) = fake_camera(|_| reply("200 OK", &[], ""));

        session(&host, AuthScheme::Basic)
            .send_query("com/ptz.cgi", HttpMethod::Get, &[])
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .header("authorization")
            .is_some_and(|value| value.starts_with("Basic ")));
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn base_url_points_at_axis_cgi() {
        let session = VapixSession::new(SessionConfig {
            host: "10.0.0.5".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(session.base_url().as_str(), "http://10.0.0.5/axis-cgi/");
        assert_eq!(session.host(), "10.0.0.5");
        assert_eq!(
            session.endpoint("opticscontrol.cgi").unwrap().as_str(),
            "http://10.0.0.5/axis-cgi/opticscontrol.cgi"
        );
        assert_eq!(
            session.endpoint("/com/ptz.cgi").unwrap().as_str(),
            "http://10.0.0.5/axis-cgi/com/ptz.cgi"
        );
    }

    #[test]
    fn invalid_host_is_rejected() {
        let result = VapixSession::new(SessionConfig {
            host: "bad host:name".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(VapixError::Connection(_))));
    }

    #[test]
    fn legacy_arguments_include_defaults() {
        let args = legacy_arguments(&[pair("query", "position")], 1700000000);
        assert_eq!(
            args,
            vec![
                pair("camera", "1"),
                pair("html", "no"),
                pair("timestamp", "1700000000"),
                pair("query", "position"),
            ]
        );
    }

    #[test]
    fn legacy_arguments_can_be_overridden() {
        let args = legacy_arguments(&[pair("camera", "2")], 0);
        assert_eq!(args[0], pair("camera", "2"));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: SessionConfig = toml::from_str("host = \"cam.local\"").unwrap();
        assert_eq!(config.host, "cam.local");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.auth, AuthScheme::Digest);
        assert_eq!(config.scheme, "http");
    }

    #[test]
    fn auth_scheme_is_lowercase_in_config() {
        let config: SessionConfig = toml::from_str("auth = \"basic\"").unwrap();
        assert_eq!(config.auth, AuthScheme::Basic);
    }
}
