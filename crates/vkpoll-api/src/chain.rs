//! Batched calls through a single `execute` request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult, TransportError};
use crate::params::Params;

struct PendingCall {
    method: String,
    params: Params,
    reply: oneshot::Sender<ApiResult<Value>>,
}

/// Result of one call in a [`Chain`]. Resolves once the chain is sent.
#[must_use = "a chained call resolves only after Chain::done"]
pub struct ChainedCall {
    rx: oneshot::Receiver<ApiResult<Value>>,
}

impl Future for ChainedCall {
    type Output = ApiResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(TransportError::new("call chain dropped before it was sent").into())
            })
        })
    }
}

/// Collects calls and sends them as one `execute` request.
///
/// ```ignore
/// let mut chain = client.chain();
/// let users = chain.append("users.get", Params::new().with("user_ids", 1));
/// let groups = chain.append("groups.getById", Params::new().with("group_ids", 1));
/// chain.done().await?;
/// let (users, groups) = (users.await?, groups.await?);
/// ```
pub struct Chain<'a> {
    client: &'a ApiClient,
    calls: Vec<PendingCall>,
}

impl<'a> Chain<'a> {
    pub(crate) const fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            calls: Vec::new(),
        }
    }

    /// Queue a call.
    pub fn append(&mut self, method: impl Into<String>, params: Params) -> ChainedCall {
        let (reply, rx) = oneshot::channel();
        self.calls.push(PendingCall {
            method: method.into(),
            params,
            reply,
        });
        ChainedCall { rx }
    }

    /// Number of queued calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Send the queued calls and settle every [`ChainedCall`].
    ///
    /// Returns one entry per call: the call's result, or the error payload
    /// reported for it. An empty chain returns an empty list without a
    /// request.
    ///
    /// # Errors
    ///
    /// When the `execute` request itself fails, every queued call is rejected
    /// with the same error and the error is returned.
    pub async fn done(self) -> ApiResult<Vec<Value>> {
        if self.calls.is_empty() {
            return Ok(Vec::new());
        }

        let answer = match execute_code(&self.calls) {
            Ok(code) => {
                debug!(calls = self.calls.len(), "sending call chain");
                self.client.execute(&code).await
            }
            Err(err) => Err(err),
        };

        match answer.and_then(split_envelope) {
            Ok((responses, errors)) => Ok(settle(self.calls, responses, errors)),
            Err(err) => {
                for call in self.calls {
                    let _ = call.reply.send(Err(err.clone()));
                }
                Err(err)
            }
        }
    }
}

fn execute_code(calls: &[PendingCall]) -> ApiResult<String> {
    let mut parts = Vec::with_capacity(calls.len());
    for call in calls {
        let params = serde_json::to_string(&call.params)?;
        parts.push(format!("API.{}({params})", call.method));
    }
    Ok(format!("return [{}];", parts.join(",")))
}

fn split_envelope(mut envelope: Value) -> ApiResult<(Vec<Value>, Vec<Value>)> {
    let responses = match envelope.get_mut("response").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(ApiError::Decode(
                "execute answer has no response list".to_string(),
            ));
        }
    };
    let errors = match envelope.get_mut("execute_errors").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    Ok((responses, errors))
}

/// Hand each call its entry. `false` and `null` mark a failed call; those
/// consume `execute_errors` in order.
fn settle(calls: Vec<PendingCall>, responses: Vec<Value>, errors: Vec<Value>) -> Vec<Value> {
    let mut responses = responses.into_iter();
    let mut errors = errors.into_iter();
    let mut settled = Vec::with_capacity(calls.len());

    for call in calls {
        let Some(entry) = responses.next() else {
            let err = ApiError::Decode(format!("{}: missing from execute answer", call.method));
            let _ = call.reply.send(Err(err));
            continue;
        };

        if matches!(entry, Value::Null | Value::Bool(false)) {
            let payload = errors.next().unwrap_or(Value::Null);
            let _ = call.reply.send(Err(ApiError::from_payload(&payload)));
            settled.push(payload);
        } else {
            let _ = call.reply.send(Ok(entry.clone()));
            settled.push(entry);
        }
    }
    settled
}
