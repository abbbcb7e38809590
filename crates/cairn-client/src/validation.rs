//! Field-level form validation.
//!
//! A [`Form`] holds named JSON values, each with an ordered list of
//! [`Rule`]s. Validating a field marks it touched and records the message of
//! the first rule it fails. Empty values (`null`, `""`) pass every rule
//! except [`Rule::required`], so optional fields only get checked once they
//! have content.

use std::{
  collections::BTreeMap,
  fmt,
  sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

// ─── Rules ───────────────────────────────────────────────────────────────────

type Check = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum RuleKind {
  Required,
  MinLength(usize),
  MaxLength(usize),
  Email,
  Url,
  Pattern(Regex),
  Custom(Check),
}

/// One validation rule and the message shown when it fails.
#[derive(Clone)]
pub struct Rule {
  kind:    RuleKind,
  message: String,
}

impl fmt::Debug for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match &self.kind {
      RuleKind::Required => "required".to_owned(),
      RuleKind::MinLength(n) => format!("min_length({n})"),
      RuleKind::MaxLength(n) => format!("max_length({n})"),
      RuleKind::Email => "email".to_owned(),
      RuleKind::Url => "url".to_owned(),
      RuleKind::Pattern(re) => format!("pattern({})", re.as_str()),
      RuleKind::Custom(_) => "custom".to_owned(),
    };
    f.debug_struct("Rule").field("kind", &kind).field("message", &self.message).finish()
  }
}

impl Rule {
  /// Non-blank string, non-empty array, or any other non-null value.
  pub fn required() -> Self {
    Self { kind: RuleKind::Required, message: "This field is required".into() }
  }

  /// At least `n` characters (or elements).
  pub fn min_length(n: usize) -> Self {
    Self { kind: RuleKind::MinLength(n), message: format!("At least {n} characters required") }
  }

  pub fn max_length(n: usize) -> Self {
    Self { kind: RuleKind::MaxLength(n), message: format!("At most {n} characters allowed") }
  }

  pub fn email() -> Self {
    Self { kind: RuleKind::Email, message: "Please enter a valid email address".into() }
  }

  /// An absolute URL.
  pub fn url() -> Self { Self { kind: RuleKind::Url, message: "Please enter a valid URL".into() } }

  pub fn pattern(regex: Regex, message: impl Into<String>) -> Self {
    Self { kind: RuleKind::Pattern(regex), message: message.into() }
  }

  /// An arbitrary predicate. Unlike the built-in rules it also sees empty
  /// values.
  pub fn custom(
    check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    message: impl Into<String>,
  ) -> Self {
    Self { kind: RuleKind::Custom(Arc::new(check)), message: message.into() }
  }

  /// Replace the default message.
  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = message.into();
    self
  }

  pub fn message(&self) -> &str { &self.message }

  pub fn check(&self, value: &Value) -> bool {
    match &self.kind {
      RuleKind::Required => match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
      },
      RuleKind::Custom(check) => check(value),
      _ if is_empty(value) => true,
      RuleKind::MinLength(n) => length(value).is_none_or(|len| len >= *n),
      RuleKind::MaxLength(n) => length(value).is_none_or(|len| len <= *n),
      RuleKind::Email => value.as_str().is_none_or(|s| EMAIL.is_match(s)),
      RuleKind::Url => value.as_str().is_none_or(|s| url::Url::parse(s).is_ok()),
      RuleKind::Pattern(re) => value.as_str().is_none_or(|s| re.is_match(s)),
    }
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}

fn length(value: &Value) -> Option<usize> {
  match value {
    Value::String(s) => Some(s.chars().count()),
    Value::Array(a) => Some(a.len()),
    _ => None,
  }
}

// ─── Form ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Field {
  pub value:   Value,
  pub rules:   Vec<Rule>,
  pub touched: bool,
  pub error:   Option<String>,
}

impl Field {
  fn new(value: Value) -> Self { Self { value, rules: Vec::new(), touched: false, error: None } }
}

/// A set of named fields with validation state.
///
/// Operations on unknown field names are no-ops; validating one succeeds.
#[derive(Debug, Clone)]
pub struct Form {
  initial:           BTreeMap<String, Value>,
  fields:            BTreeMap<String, Field>,
  pub is_submitting: bool,
}

impl Form {
  pub fn new<K: Into<String>>(initial: impl IntoIterator<Item = (K, Value)>) -> Self {
    let initial: BTreeMap<String, Value> =
      initial.into_iter().map(|(k, v)| (k.into(), v)).collect();
    let fields = initial.iter().map(|(k, v)| (k.clone(), Field::new(v.clone()))).collect();
    Self { initial, fields, is_submitting: false }
  }

  /// A form whose fields are the properties of `values`, which must
  /// serialise to a JSON object.
  pub fn from_values<T: Serialize>(values: &T) -> Result<Self, serde_json::Error> {
    match serde_json::to_value(values)? {
      Value::Object(map) => Ok(Self::new(map)),
      other => Err(serde::ser::Error::custom(format!("expected an object, got {other}"))),
    }
  }

  pub fn field(&self, name: &str) -> Option<&Field> { self.fields.get(name) }

  pub fn error(&self, name: &str) -> Option<&str> {
    self.fields.get(name).and_then(|f| f.error.as_deref())
  }

  pub fn set_field_rules(&mut self, name: &str, rules: Vec<Rule>) {
    if let Some(field) = self.fields.get_mut(name) {
      field.rules = rules;
    }
  }

  pub fn set_field_value(&mut self, name: &str, value: impl Into<Value>) {
    if let Some(field) = self.fields.get_mut(name) {
      field.value = value.into();
    }
  }

  /// Mark `name` touched and check its rules in order; the first failure's
  /// message becomes the field's error.
  pub fn validate_field(&mut self, name: &str) -> bool {
    let Some(field) = self.fields.get_mut(name) else {
      return true;
    };
    field.touched = true;
    field.error = field.rules.iter().find(|r| !r.check(&field.value)).map(|r| r.message.clone());
    field.error.is_none()
  }

  /// Validate every field, reporting all errors rather than stopping at the
  /// first invalid field.
  pub fn validate_all(&mut self) -> bool {
    let names: Vec<String> = self.fields.keys().cloned().collect();
    names.iter().fold(true, |valid, name| self.validate_field(name) && valid)
  }

  pub fn clear_field_error(&mut self, name: &str) {
    if let Some(field) = self.fields.get_mut(name) {
      field.error = None;
    }
  }

  /// Clear every error and touched flag.
  pub fn clear_all_errors(&mut self) {
    for field in self.fields.values_mut() {
      field.error = None;
      field.touched = false;
    }
  }

  /// Restore initial values and clear validation state. Rules are kept.
  pub fn reset(&mut self) {
    for (name, field) in &mut self.fields {
      field.value = self.initial.get(name).cloned().unwrap_or(Value::Null);
      field.error = None;
      field.touched = false;
    }
    self.is_submitting = false;
  }

  pub fn form_data(&self) -> Map<String, Value> {
    self.fields.iter().map(|(k, f)| (k.clone(), f.value.clone())).collect()
  }

  /// The current values deserialised into `T`.
  pub fn form_data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(self.form_data()))
  }

  pub fn has_errors(&self) -> bool { self.fields.values().any(|f| f.error.is_some()) }

  /// No touched field has an error. Untouched fields count as valid.
  pub fn is_valid(&self) -> bool {
    self.fields.values().all(|f| !f.touched || f.error.is_none())
  }

  pub fn is_dirty(&self) -> bool {
    self.fields.iter().any(|(name, f)| self.initial.get(name) != Some(&f.value))
  }

  pub fn touched_fields(&self) -> Vec<&str> {
    self.fields.iter().filter(|(_, f)| f.touched).map(|(k, _)| k.as_str()).collect()
  }
}
