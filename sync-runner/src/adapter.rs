use async_trait::async_trait;
use serde_json::Value;

/// Adapter interface for one external API.
///
/// An adapter is constructed once per project and lives as long as the
/// registry that owns it. It authenticates while being constructed and
/// records every failure in its error log instead of returning it; callers
/// read [`errors`](ExternalApi::errors) after each operation.
///
/// # Lifecycle
/// 1. Registry constructs the adapter on first use (settings load, token
///    check, credential exchange if needed)
/// 2. Runner calls `begin_call()`
/// 3. Runner inspects `errors()`; if empty, calls `send_data(payload)`
/// 4. Runner turns the result into `{errors, response}`
///
/// # Example
/// ```no_run
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use sync_runner::ExternalApi;
///
/// struct EchoApi {
///     errors: Vec<String>,
/// }
///
/// #[async_trait]
/// impl ExternalApi for EchoApi {
///     fn name(&self) -> &str {
///         "echo_api"
///     }
///
///     fn errors(&self) -> &[String] {
///         &self.errors
///     }
///
///     async fn send_data(&mut self, payload: &Value) -> Option<Value> {
///         Some(json!({ "echo": payload }))
///     }
/// }
/// ```
#[async_trait]
pub trait ExternalApi: Send + Sync {
    /// Adapter name (e.g. `"example_api"`), used in logs.
    fn name(&self) -> &str;

    /// Errors recorded so far, oldest first.
    fn errors(&self) -> &[String];

    /// Called by the runner before it inspects `errors()`.
    ///
    /// Adapters whose errors are scoped per call reset here.
    async fn begin_call(&mut self) {}

    /// Sends `payload` and returns the decoded response.
    ///
    /// Returns `None` without any request when the payload is blank, and
    /// `None` when the request fails (the failure is in `errors()`).
    async fn send_data(&mut self, payload: &Value) -> Option<Value>;
}

/// True for values that carry no data: `null`, `false`, `0`, `""`, `[]`, `{}`.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
