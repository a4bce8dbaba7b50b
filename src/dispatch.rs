//! Routes named method calls with loosely typed arguments to an
//! [`IdentityManager`].
//!
//! This is the only place where typed errors are erased: methods that return
//! data yield `None` on failure, and methods that return a flag yield
//! `Some(Value::Bool(false))`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{IdentityKitError, Result};
use crate::identity::IdentityManager;
use crate::key::{DEFAULT_RSA_BITS, KeyAttributes};
use crate::store::IdentityStore;

/// A loosely typed argument or result value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// A method name plus named arguments.
#[derive(Clone, Debug, Default)]
pub struct MethodCall {
    pub method: String,
    pub arguments: BTreeMap<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: BTreeMap::new(),
        }
    }

    /// Adds an argument, builder style.
    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }

    fn string(&self, name: &str) -> Result<&str> {
        match self.arguments.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(invalid_argument(name, "a string", other)),
            None => Err(missing_argument(name)),
        }
    }

    fn bytes(&self, name: &str) -> Result<&[u8]> {
        match self.arguments.get(name) {
            Some(Value::Bytes(b)) => Ok(b),
            Some(other) => Err(invalid_argument(name, "bytes", other)),
            None => Err(missing_argument(name)),
        }
    }

    fn optional_int(&self, name: &str) -> Result<Option<i64>> {
        match self.arguments.get(name) {
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(invalid_argument(name, "an integer", other)),
        }
    }

    fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.arguments.get(name) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(invalid_argument(name, "a bool", other)),
        }
    }
}

fn missing_argument(name: &str) -> IdentityKitError {
    IdentityKitError::InvalidInput(format!("missing argument {name:?}"))
}

fn invalid_argument(name: &str, expected: &str, found: &Value) -> IdentityKitError {
    IdentityKitError::InvalidInput(format!("argument {name:?} must be {expected}, got {found:?}"))
}

/// The methods a [`Dispatcher`] understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    GenerateKey,
    DeleteKey,
    DeleteCert,
    LoadPublicKey,
    CreateIdentity,
    LoadIdentity,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GenerateKey => "generateKey",
            Method::DeleteKey => "deleteKey",
            Method::DeleteCert => "deleteCert",
            Method::LoadPublicKey => "loadPublicKey",
            Method::CreateIdentity => "createIdentity",
            Method::LoadIdentity => "loadIdentity",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = IdentityKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generateKey" => Ok(Method::GenerateKey),
            "deleteKey" => Ok(Method::DeleteKey),
            "deleteCert" => Ok(Method::DeleteCert),
            "loadPublicKey" => Ok(Method::LoadPublicKey),
            "createIdentity" => Ok(Method::CreateIdentity),
            "loadIdentity" => Ok(Method::LoadIdentity),
            other => Err(IdentityKitError::InvalidInput(format!(
                "unknown method {other:?}"
            ))),
        }
    }
}

/// Dispatches [`MethodCall`]s to an [`IdentityManager`].
pub struct Dispatcher<S> {
    manager: IdentityManager<S>,
}

impl<S: IdentityStore> Dispatcher<S> {
    pub fn new(manager: IdentityManager<S>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &IdentityManager<S> {
        &self.manager
    }

    /// Handles one call. Unknown methods yield `None`.
    pub fn handle(&self, call: &MethodCall) -> Option<Value> {
        let method = match call.method.parse::<Method>() {
            Ok(method) => method,
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };

        match method {
            Method::GenerateKey => erase_data(method, self.generate_key(call)),
            Method::DeleteKey => erase_flag(
                method,
                call.string("tag").and_then(|tag| self.manager.delete_key(tag)),
            ),
            Method::DeleteCert => erase_flag(
                method,
                call.string("label")
                    .and_then(|label| self.manager.delete_certificate(label)),
            ),
            Method::LoadPublicKey => erase_data(
                method,
                call.string("tag")
                    .and_then(|tag| self.manager.load_public_key(tag)),
            ),
            Method::CreateIdentity => erase_flag(method, self.create_identity(call)),
            Method::LoadIdentity => erase_data(method, self.load_identity(call)),
        }
    }

    fn generate_key(&self, call: &MethodCall) -> Result<Vec<u8>> {
        let tag = call.string("tag")?;
        let size = match call.optional_int("size")? {
            Some(size) if size <= 0 => {
                return Err(IdentityKitError::InvalidInput(format!(
                    "key size must be positive, got {size}"
                )));
            }
            Some(size) => usize::try_from(size)
                .map_err(|e| IdentityKitError::InvalidInput(e.to_string()))?,
            None => DEFAULT_RSA_BITS,
        };
        let permanent = call.optional_bool("permanent")?.unwrap_or(true);
        let attributes = KeyAttributes::builder()
            .tag(tag)
            .size(size)
            .permanent(permanent)
            .build();
        self.manager.generate_key(&attributes)
    }

    fn create_identity(&self, call: &MethodCall) -> Result<()> {
        let data = call.bytes("data")?;
        let label = call.string("label")?;
        self.manager.create_identity(data, label)
    }

    fn load_identity(&self, call: &MethodCall) -> Result<Vec<u8>> {
        let tag = call.string("tag")?;
        let name = call.string("name")?;
        let password = call.string("password")?;
        let container = self.manager.load_identity(tag, name, password)?;
        Ok(container.into_bytes())
    }
}

fn erase_flag(method: Method, result: Result<()>) -> Option<Value> {
    match result {
        Ok(()) => Some(Value::Bool(true)),
        Err(e) => {
            log::warn!("{method} failed: {e}");
            Some(Value::Bool(false))
        }
    }
}

fn erase_data(method: Method, result: Result<Vec<u8>>) -> Option<Value> {
    match result {
        Ok(bytes) => Some(Value::Bytes(bytes)),
        Err(e) => {
            log::warn!("{method} failed: {e}");
            None
        }
    }
}
