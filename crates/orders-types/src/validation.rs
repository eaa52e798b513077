//! Validation of implementation-specific configuration tables.
//!
//! Every pluggable implementation receives its own raw TOML table (for
//! example `[state.implementations.dapr]`) and describes the accepted keys
//! with a [`Schema`]. Factories validate the table before constructing the
//! implementation so misconfiguration surfaces at startup.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Accepted type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
		}
	}
}

/// Custom check run after the type check; returns a message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field of a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom check to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		let type_ok = match &self.field_type {
			FieldType::String => value.is_str(),
			FieldType::Boolean => value.is_bool(),
			FieldType::Integer { min, max } => match value.as_integer() {
				Some(n) => {
					if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
						return Err(ValidationError::InvalidValue {
							field: self.name.clone(),
							message: format!(
								"Value {} is outside the allowed range [{}, {}]",
								n,
								min.map_or("-inf".to_string(), |v| v.to_string()),
								max.map_or("inf".to_string(), |v| v.to_string()),
							),
						});
					}
					true
				},
				None => false,
			},
		};

		if !type_ok {
			return Err(ValidationError::TypeMismatch {
				field: self.name.clone(),
				expected: self.field_type.name().to_string(),
				actual: value.type_str().to_string(),
			});
		}

		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

/// Required and optional fields accepted by one implementation table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	///
	/// Required fields must be present; every present field must have the
	/// declared type and pass its custom validator. Unknown keys are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

/// Configuration schema of a pluggable implementation.
#[async_trait]
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(src: &str) -> toml::Value {
		toml::from_str(src).unwrap()
	}

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("http_endpoint", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if s.starts_with("http") => Ok(()),
					_ => Err("must be an http(s) URL".to_string()),
				}
			})],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("enabled", FieldType::Boolean),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config = table("http_endpoint = \"http://localhost:3500\"\ntimeout_seconds = 5");
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required() {
		let config = table("timeout_seconds = 5");
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::MissingField("http_endpoint".into()))
		);
	}

	#[test]
	fn test_type_mismatch() {
		let config = table("http_endpoint = \"http://x\"\nenabled = \"yes\"");
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "enabled"));
	}

	#[test]
	fn test_bounds_and_custom_validator() {
		let config = table("http_endpoint = \"http://x\"\ntimeout_seconds = 0");
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));

		let config = table("http_endpoint = \"ftp://x\"");
		let err = schema().validate(&config).unwrap_err();
		assert!(err.to_string().contains("must be an http(s) URL"));
	}

	#[test]
	fn test_non_table_root() {
		let err = schema().validate(&toml::Value::Integer(1)).unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "root"));
	}
}
