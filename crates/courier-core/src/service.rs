//! Service object model
//!
//! A registered service is an arbitrary object the calling side knows only by
//! name. Rust has no runtime reflection, so a service describes itself through
//! [`Service::lookup`]: given a dotted path split into segments, it returns
//! the [`Member`] found there, either a plain value or a callable method.
//!
//! [`ServiceObject`] is a ready-made dynamic implementation built from
//! closures; plain JSON values also implement [`Service`] for data-only
//! services.
//!
//! Methods receive the caller's [`SenderInfo`] through an explicit
//! [`CallContext`] argument. Nothing about the caller is ever stored on the
//! service instance, so overlapping calls to the same instance each see their
//! own sender.

use crate::context::SenderInfo;
use crate::errors::{CourierError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Pending result of a method invocation
pub type MethodFuture = BoxFuture<'static, Result<Value>>;

/// Call-scoped metadata handed to every method invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    /// Name the service is registered under
    pub service: String,
    /// Dotted path that was called, `None` for the root
    pub path: Option<String>,
    /// Who sent the call
    pub sender: SenderInfo,
}

/// Positional call arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// Wrap a raw argument list
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of arguments supplied
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no arguments were supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw argument at `index`
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserialize the argument at `index`
    ///
    /// A missing argument reads as `null`, so optional parameters can be
    /// declared as `Option<T>`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| CourierError::invalid_call(format!("argument {index}: {e}")))
    }

    /// Consume into the raw list
    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A callable member of a service
pub trait Method: Send + Sync {
    /// Invoke with call-scoped context and arguments
    fn invoke(&self, ctx: CallContext, args: Args) -> MethodFuture;
}

struct FnMethod<F>(F);

impl<F, Fut> Method for FnMethod<F>
where
    F: Fn(CallContext, Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn invoke(&self, ctx: CallContext, args: Args) -> MethodFuture {
        (self.0)(ctx, args).boxed()
    }
}

/// Wrap an async closure as a [`Method`]
pub fn method_fn<F, Fut>(f: F) -> Arc<dyn Method>
where
    F: Fn(CallContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnMethod(f))
}

/// What a path resolves to on a service
#[derive(Clone)]
pub enum Member {
    /// A plain value, returned as-is
    Value(Value),
    /// A callable, invoked with the call's arguments
    Method(Arc<dyn Method>),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Member::Method(_) => f.write_str("Method(..)"),
        }
    }
}

/// An object that can be exposed under a name
pub trait Service: Send + Sync + 'static {
    /// Resolve a path; an empty path is the service root
    fn lookup(&self, path: &[&str]) -> Option<Member>;
}

impl Service for Value {
    fn lookup(&self, path: &[&str]) -> Option<Member> {
        let mut current = self;
        for segment in path {
            current = current.as_object()?.get(*segment)?;
        }
        Some(Member::Value(current.clone()))
    }
}

enum Node {
    Value(Value),
    Method(Arc<dyn Method>),
    Object(ServiceObject),
}

/// Dynamic service built from values, methods and nested objects
#[derive(Default)]
pub struct ServiceObject {
    members: BTreeMap<String, Node>,
}

impl ServiceObject {
    /// Start an empty object
    pub fn builder() -> ServiceObjectBuilder {
        ServiceObjectBuilder::default()
    }

    /// Names of the direct members
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Value view of the object: value and nested-object fields, methods omitted
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, node) in &self.members {
            match node {
                Node::Value(value) => {
                    map.insert(name.clone(), value.clone());
                }
                Node::Object(object) => {
                    map.insert(name.clone(), object.to_value());
                }
                Node::Method(_) => {}
            }
        }
        Value::Object(map)
    }
}

impl fmt::Debug for ServiceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, node) in &self.members {
            match node {
                Node::Value(value) => map.entry(name, value),
                Node::Method(_) => map.entry(name, &"<method>"),
                Node::Object(object) => map.entry(name, object),
            };
        }
        map.finish()
    }
}

impl Service for ServiceObject {
    fn lookup(&self, path: &[&str]) -> Option<Member> {
        let Some((first, rest)) = path.split_first() else {
            return Some(Member::Value(self.to_value()));
        };
        match self.members.get(*first)? {
            Node::Value(value) => value.lookup(rest),
            Node::Method(method) if rest.is_empty() => Some(Member::Method(Arc::clone(method))),
            Node::Method(_) => None,
            Node::Object(object) => object.lookup(rest),
        }
    }
}

/// Builder for [`ServiceObject`]
#[derive(Default)]
pub struct ServiceObjectBuilder {
    object: ServiceObject,
}

impl ServiceObjectBuilder {
    /// Add a plain value member
    ///
    /// A value that cannot be represented as JSON is stored as `null` and a
    /// warning is logged.
    pub fn value(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(member = %name, error = %err, "Value member is not JSON, stored as null");
                Value::Null
            }
        };
        self.object.members.insert(name, Node::Value(value));
        self
    }

    /// Add an async method member
    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CallContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.object
            .members
            .insert(name.into(), Node::Method(method_fn(f)));
        self
    }

    /// Add a pre-built method member
    pub fn method_object(mut self, name: impl Into<String>, method: Arc<dyn Method>) -> Self {
        self.object.members.insert(name.into(), Node::Method(method));
        self
    }

    /// Add a nested object member
    pub fn object(mut self, name: impl Into<String>, object: ServiceObject) -> Self {
        self.object.members.insert(name.into(), Node::Object(object));
        self
    }

    /// Finish building
    pub fn build(self) -> ServiceObject {
        self.object
    }
}
