use http::StatusCode;

/// Errors that know how to present themselves to an HTTP caller
///
/// The gateway renders every failure through this trait so callers always
/// see the same OpenAI-shaped error object.
pub trait HttpError: std::error::Error {
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// `{"error": {"message", "type", "code": null}}`
    fn error_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.client_message(),
                "type": self.error_type(),
                "code": serde_json::Value::Null,
            }
        })
    }
}
