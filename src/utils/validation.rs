use crate::utils::error::{EngineError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<Url> {
    if url_str.is_empty() {
        return Err(EngineError::config(field_name, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(EngineError::config(
                field_name,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(EngineError::config(
            field_name,
            format!("Invalid URL format '{}': {}", url_str, e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(EngineError::config(field_name, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(EngineError::config(field_name, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_existing_file(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;
    if !Path::new(path).is_file() {
        return Err(EngineError::config(
            field_name,
            format!("File not found: {}", path),
        ));
    }
    Ok(())
}

pub fn validate_existing_dir(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;
    if !Path::new(path).is_dir() {
        return Err(EngineError::config(
            field_name,
            format!("Directory not found: {}", path),
        ));
    }
    Ok(())
}

/// `${VAR}` left over after environment substitution.
pub fn validate_resolved(field_name: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(EngineError::config(
            field_name,
            format!("Unresolved environment variable in '{}'", value),
        ));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EngineError::config(
            field_name,
            format!("Value {} must be at least {}", value, min_value),
        ));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| EngineError::config(field_name, "Required field is missing"))
}

/// Range check for user-supplied numbers; failures are input errors.
pub fn validate_range(field_name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::input(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    if value < min || value > max {
        return Err(EngineError::input(format!(
            "{} must be between {} and {}, got {}",
            field_name, min, max, value
        )));
    }
    Ok(())
}
