//! Request validation pipeline
//!
//! A [`Schema`] is evaluated against a raw JSON body in a fixed order and
//! stops at the first failure:
//!
//! 1. presence and type of every declared field
//! 2. shape rules (length, pattern, whitespace)
//! 3. cross-field rules
//! 4. the optional asynchronous rule, which may consult the credential store
//!
//! Unknown fields are ignored and an accepted payload is passed on untouched.

pub mod middleware;
pub mod schemas;

pub use middleware::{validate_request, SchemaGuard};
pub use schemas::{user_check_schema, user_login_schema, user_register_schema, user_update_schema};

use crate::{error::AppError, repository::CredentialStore};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use validator::ValidateLength;

/// Messages for the presence/type phase
#[derive(Debug, Clone, Copy)]
pub struct FieldMessages {
    /// Value is `null` or not a string
    pub type_error: &'static str,
    /// Value is absent (when required) or the empty string
    pub required: &'static str,
}

/// Synchronous per-field shape checks, applied in declaration order
#[derive(Debug, Clone, Copy)]
pub enum ShapeRule {
    MinLength { min: u64, message: &'static str },
    Pattern { regex: &'static Lazy<Regex>, message: &'static str },
    NoSpaces { message: &'static str },
}

impl ShapeRule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        let ok = match self {
            ShapeRule::MinLength { min, .. } => value.validate_length(Some(*min), None, None),
            ShapeRule::Pattern { regex, .. } => regex.is_match(value),
            ShapeRule::NoSpaces { .. } => !value.contains(' '),
        };

        if ok {
            Ok(())
        } else {
            Err(self.message())
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ShapeRule::MinLength { message, .. }
            | ShapeRule::Pattern { message, .. }
            | ShapeRule::NoSpaces { message } => message,
        }
    }
}

/// One declared string field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub messages: FieldMessages,
    pub shape: Vec<ShapeRule>,
}

impl FieldRule {
    pub fn required(name: &'static str, messages: FieldMessages) -> Self {
        Self {
            name,
            required: true,
            messages,
            shape: Vec::new(),
        }
    }

    pub fn optional(name: &'static str, messages: FieldMessages) -> Self {
        Self {
            name,
            required: false,
            messages,
            shape: Vec::new(),
        }
    }

    pub fn with(mut self, rule: ShapeRule) -> Self {
        self.shape.push(rule);
        self
    }

    fn check_presence(&self, value: Option<&Value>) -> Result<(), &'static str> {
        match value {
            None if self.required => Err(self.messages.required),
            None => Ok(()),
            Some(Value::String(s)) if s.is_empty() => Err(self.messages.required),
            Some(Value::String(_)) => Ok(()),
            Some(_) => Err(self.messages.type_error),
        }
    }

    fn check_shape(&self, value: Option<&Value>) -> Result<(), &'static str> {
        let Some(s) = value.and_then(Value::as_str) else {
            return Ok(());
        };
        self.shape.iter().try_for_each(|rule| rule.check(s))
    }
}

/// Rules that compare two fields
#[derive(Debug, Clone, Copy)]
pub enum CrossFieldRule {
    /// `field` must hold exactly the same JSON value as `other`
    MustEqual {
        field: &'static str,
        other: &'static str,
        message: &'static str,
    },
}

impl CrossFieldRule {
    fn check(&self, payload: &Value) -> Result<(), FieldError> {
        match self {
            CrossFieldRule::MustEqual { field, other, message } => {
                if payload.get(field) == payload.get(other) {
                    Ok(())
                } else {
                    Err(FieldError::new(field, message))
                }
            }
        }
    }
}

/// Rules that need the credential store; only reached when every
/// synchronous rule has passed
#[derive(Debug, Clone, Copy)]
pub enum AsyncRule {
    /// The username in `field` must not belong to an existing record
    UsernameAvailable {
        field: &'static str,
        message: &'static str,
    },
}

impl AsyncRule {
    async fn check(
        &self,
        payload: &Value,
        store: &dyn CredentialStore,
    ) -> Result<Option<FieldError>, AppError> {
        match self {
            AsyncRule::UsernameAvailable { field, message } => {
                let Some(username) = payload.get(field).and_then(Value::as_str) else {
                    return Ok(None);
                };
                if store.find_by_username(username).await?.is_some() {
                    Ok(Some(FieldError::new(field, message)))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// The single reported violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<FieldError> for AppError {
    fn from(e: FieldError) -> Self {
        AppError::Validation {
            field: e.field,
            message: e.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The original payload, unmodified
    Accepted(Value),
    Rejected(FieldError),
}

/// Named per-endpoint schema
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldRule>,
    pub cross_field: Vec<CrossFieldRule>,
    pub async_rule: Option<AsyncRule>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            cross_field: Vec::new(),
            async_rule: None,
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn cross_field(mut self, rule: CrossFieldRule) -> Self {
        self.cross_field.push(rule);
        self
    }

    pub fn async_rule(mut self, rule: AsyncRule) -> Self {
        self.async_rule = Some(rule);
        self
    }

    /// Phases 1 to 3
    pub fn check_sync(&self, payload: &Value) -> Result<(), FieldError> {
        for rule in &self.fields {
            rule.check_presence(payload.get(rule.name))
                .map_err(|message| FieldError::new(rule.name, message))?;
        }

        for rule in &self.fields {
            rule.check_shape(payload.get(rule.name))
                .map_err(|message| FieldError::new(rule.name, message))?;
        }

        self.cross_field.iter().try_for_each(|rule| rule.check(payload))
    }

    /// Run the full pipeline.
    ///
    /// `Err` means the store could not answer, which is not a verdict.
    pub async fn evaluate(
        &self,
        payload: Value,
        store: &dyn CredentialStore,
    ) -> Result<Verdict, AppError> {
        if let Err(e) = self.check_sync(&payload) {
            return Ok(Verdict::Rejected(e));
        }

        if let Some(rule) = &self.async_rule {
            if let Some(e) = rule.check(&payload, store).await? {
                return Ok(Verdict::Rejected(e));
            }
        }

        Ok(Verdict::Accepted(payload))
    }
}
