//! Blocking HTTP client backed by `ureq`.

use catsync_engine::{HttpClient, HttpRequest, HttpResponse};

/// [`HttpClient`] implementation over a shared `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Creates a client with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let mut call = self
            .agent
            .request(request.method.as_str(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        // Error statuses still carry a body the engine classifies.
        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| format!("failed to read response body: {e}"))?;
                Ok(HttpResponse::new(status, body))
            }
            Err(ureq::Error::Transport(transport)) => Err(transport.to_string()),
        }
    }
}
