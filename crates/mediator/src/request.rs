//! Requests, their handlers and validation.

use std::any::TypeId;
use std::fmt;

use async_trait::async_trait;
use common::OperationResult;

use crate::{RequestContext, Result};

/// Whether a request changes state or only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Command,
    Query,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Command => "command",
            RequestKind::Query => "query",
        }
    }
}

/// A command or query routed through the mediator.
///
/// The concrete type is the routing key: exactly one handler exists per
/// request type.
pub trait Request: Send + Sync + 'static {
    /// Payload of a successful outcome.
    type Output: Send + 'static;

    const KIND: RequestKind;

    /// Short name used in logs and metrics.
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Checks the request content before it reaches the handler.
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Strips the module path of the outer type; generic arguments are kept
/// as written.
fn short_type_name(full: &'static str) -> &'static str {
    let outer = full.find('<').map_or(full, |at| &full[..at]);
    match outer.rfind("::") {
        Some(at) => &full[at + 2..],
        None => full,
    }
}

/// Static description of a request type, available to behaviors without
/// knowing the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub type_id: TypeId,
    pub name: &'static str,
    pub kind: RequestKind,
}

impl RequestDescriptor {
    pub fn of<R: Request>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::name(),
            kind: R::KIND,
        }
    }
}

/// Handles one request type.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, ctx: &RequestContext)
    -> Result<OperationResult<R::Output>>;
}

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found while validating a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a problem with a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    /// Records a problem if `condition` does not hold.
    pub fn check(&mut self, condition: bool, field: &'static str, message: impl Into<String>) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` if nothing was recorded.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    struct RenameThing {
        name: String,
    }

    impl Request for RenameThing {
        type Output = ();
        const KIND: RequestKind = RequestKind::Command;

        fn validate(&self) -> std::result::Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            errors.check(!self.name.is_empty(), "name", "must not be empty");
            errors.check(self.name.len() <= 5, "name", "too long");
            errors.into_result()
        }
    }

    #[test]
    fn default_name_is_short_type_name() {
        assert_eq!(RenameThing::name(), "RenameThing");
        let descriptor = RequestDescriptor::of::<RenameThing>();
        assert_eq!(descriptor.kind, RequestKind::Command);
        assert_eq!(descriptor.type_id, TypeId::of::<RenameThing>());
    }

    struct Lookup<T> {
        _key: std::marker::PhantomData<T>,
    }

    impl<T: Send + Sync + 'static> Request for Lookup<T> {
        type Output = ();
        const KIND: RequestKind = RequestKind::Query;
    }

    #[test]
    fn generic_request_keeps_its_arguments() {
        let name = Lookup::<RenameThing>::name();
        assert!(name.starts_with("Lookup<"), "{name}");
        assert!(name.ends_with("::RenameThing>"), "{name}");
        assert_eq!(short_type_name("a::b::Plain"), "Plain");
        assert_eq!(short_type_name("Bare"), "Bare");
        assert_eq!(
            short_type_name("a::Pair<x::Left, y::Right>"),
            "Pair<x::Left, y::Right>"
        );
    }

    #[test]
    fn validation_messages_are_joined() {
        assert!(
            RenameThing {
                name: "ok".into()
            }
            .validate()
            .is_ok()
        );

        let errors = RenameThing {
            name: "far too long".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.to_string(), "name: too long");

        let mut errors = ValidationErrors::new();
        errors.add("a", "bad");
        errors.add("b", "worse");
        assert_eq!(errors.to_string(), "a: bad; b: worse");
    }
}
