//! Validation of per-implementation configuration tables.
//!
//! Each backend declares the keys it understands under
//! `[<section>.implementations.<name>]` as a [`Schema`]; the schema is checked
//! before the backend is built so misconfiguration fails at startup.

use thiserror::Error;

#[derive(Debug, Error)]
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

/// Expected type of a configuration value.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An `http://` or `https://` URL.
	Url,
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
}

/// Extra check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

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

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional keys of one configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks presence of required keys and the type of every known key.
	/// Unknown keys are ignored.
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

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn check_type(field: &str, value: &toml::Value, expected: &FieldType) -> Result<(), ValidationError> {
	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch(field, "string", value))?;
		},
		FieldType::Url => {
			let url = value.as_str().ok_or_else(|| mismatch(field, "string", value))?;
			if !(url.starts_with("http://") || url.starts_with("https://")) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("'{}' is not an http(s) URL", url),
				});
			}
		},
		FieldType::Integer { min, max } => {
			let int = value
				.as_integer()
				.ok_or_else(|| mismatch(field, "integer", value))?;
			if let Some(min) = min.filter(|min| int < *min) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("Value {} is less than minimum {}", int, min),
				});
			}
			if let Some(max) = max.filter(|max| int > *max) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("Value {} is greater than maximum {}", int, max),
				});
			}
		},
		FieldType::Boolean => {
			value.as_bool().ok_or_else(|| mismatch(field, "boolean", value))?;
		},
	}
	Ok(())
}

/// Implemented by every pluggable backend to validate its configuration table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("endpoint", FieldType::Url)],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(120),
					},
				),
				Field::new("api_key", FieldType::String).with_validator(|v| {
					if v.as_str().is_some_and(|s| s.is_empty()) {
						Err("must not be empty".to_string())
					} else {
						Ok(())
					}
				}),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value =
			toml::from_str("endpoint = \"https://push.example\"\ntimeout_seconds = 10").unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("timeout_seconds = 10").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::MissingField(f)) if f == "endpoint"
		));
	}

	#[test]
	fn test_bounds_and_custom_validator() {
		let config: toml::Value =
			toml::from_str("endpoint = \"https://x\"\ntimeout_seconds = 0").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));

		let config: toml::Value = toml::from_str("endpoint = \"https://x\"\napi_key = \"\"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "api_key"
		));
	}

	#[test]
	fn test_url_must_be_http() {
		let config: toml::Value = toml::from_str("endpoint = \"ftp://x\"").unwrap();
		assert!(schema().validate(&config).is_err());
	}
}
