//! Procedure handler traits and closure adapters.
//!
//! Arguments and results cross the engine as `serde_json::Value`; typed
//! adapters convert to concrete shapes inside the handler that owns the name.

use crate::error::ProcedureError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fire-and-forget handler.
#[async_trait]
pub trait AsyncProcedure: Send + Sync {
    async fn invoke(&self, args: Value) -> Result<(), ProcedureError>;
}

/// Call-and-reply handler. May suspend before producing its result.
#[async_trait]
pub trait SyncProcedure: Send + Sync {
    async fn invoke(&self, args: Value) -> Result<Value, ProcedureError>;
}

/// Untyped fire-and-forget closure.
pub struct AsyncFn<F>(F);

#[async_trait]
impl<F, Fut> AsyncProcedure for AsyncFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
{
    async fn invoke(&self, args: Value) -> Result<(), ProcedureError> {
        (self.0)(args).await
    }
}

/// Untyped call-and-reply closure.
pub struct SyncFn<F>(F);

#[async_trait]
impl<F, Fut> SyncProcedure for SyncFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
{
    async fn invoke(&self, args: Value) -> Result<Value, ProcedureError> {
        (self.0)(args).await
    }
}

/// Fire-and-forget closure over a concrete argument type.
pub struct TypedAsync<F, A> {
    f: F,
    _args: PhantomData<fn(A)>,
}

#[async_trait]
impl<F, Fut, A> AsyncProcedure for TypedAsync<F, A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
    A: DeserializeOwned + Send + 'static,
{
    async fn invoke(&self, args: Value) -> Result<(), ProcedureError> {
        let args = decode_args::<A>(args)?;
        (self.f)(args).await
    }
}

/// Call-and-reply closure over concrete argument and result types.
pub struct TypedSync<F, A, R> {
    f: F,
    _shape: PhantomData<fn(A) -> R>,
}

#[async_trait]
impl<F, Fut, A, R> SyncProcedure for TypedSync<F, A, R>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ProcedureError>> + Send + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn invoke(&self, args: Value) -> Result<Value, ProcedureError> {
        let args = decode_args::<A>(args)?;
        let result = (self.f)(args).await?;
        serde_json::to_value(result).map_err(|e| ProcedureError::InvalidResult(e.to_string()))
    }
}

fn decode_args<A: DeserializeOwned>(args: Value) -> Result<A, ProcedureError> {
    serde_json::from_value(args).map_err(|e| ProcedureError::InvalidArgs(e.to_string()))
}

/// Wrap an untyped fire-and-forget closure.
pub fn async_fn<F, Fut>(f: F) -> Arc<dyn AsyncProcedure>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
{
    Arc::new(AsyncFn(f))
}

/// Wrap an untyped call-and-reply closure.
pub fn sync_fn<F, Fut>(f: F) -> Arc<dyn SyncProcedure>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
{
    Arc::new(SyncFn(f))
}

/// Wrap a fire-and-forget closure taking a concrete argument type.
pub fn typed_async<F, Fut, A>(f: F) -> Arc<dyn AsyncProcedure>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
    A: DeserializeOwned + Send + 'static,
{
    Arc::new(TypedAsync {
        f,
        _args: PhantomData,
    })
}

/// Wrap a call-and-reply closure with concrete argument and result types.
pub fn typed_sync<F, Fut, A, R>(f: F) -> Arc<dyn SyncProcedure>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ProcedureError>> + Send + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    Arc::new(TypedSync {
        f,
        _shape: PhantomData,
    })
}

/// Arguments enriched with the identity of the calling peer.
///
/// Wire shape: `{ "Player": ..., "Args": ... }`. Built by a transport adapter
/// through the dispatch argument hook so handlers never see the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerArgs<T = Value> {
    pub player: String,
    pub args: T,
}

impl CallerArgs<Value> {
    /// Wrap raw arguments with the caller identity.
    pub fn wrap(player: impl Into<String>, args: Value) -> Value {
        serde_json::json!({
            "Player": player.into(),
            "Args": args,
        })
    }
}
