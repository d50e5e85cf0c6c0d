use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::ApiError;
use crate::types::Role;

/// JSON body that has passed its `validator` schema.
///
/// Malformed JSON is rejected with `INVALID_JSON`; schema violations with
/// `VALIDATION_ERROR` and a `details` map keyed by camelCase field name.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation_error("Invalid data", Some(field_messages(&errors)))
    }
}

fn field_messages(errors: &ValidationErrors) -> HashMap<String, String> {
    errors
        .errors()
        .iter()
        .map(|(field, kind)| {
            let message = match kind {
                ValidationErrorsKind::Field(list) => list
                    .first()
                    .map(describe)
                    .unwrap_or_else(|| "Invalid value".to_string()),
                ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => "Invalid value".to_string(),
            };
            (camel_case(field), message)
        })
        .collect()
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |name: &str| error.params.get(name).map(|v| v.to_string());
    match error.code.as_ref() {
        "email" => "Invalid email address".to_string(),
        "length" => match param("min") {
            Some(min) if min == "1" => "This field is required".to_string(),
            Some(min) => format!("Must be at least {} characters", min),
            None => "Invalid length".to_string(),
        },
        "range" => match param("min") {
            Some(min) => format!("Must be at least {}", min),
            None => "Out of range".to_string(),
        },
        other => format!("Invalid value ({})", other),
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Largest value a `NUMERIC(14, 2)` money column holds
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Positive once rounded to cents, and small enough for the money columns
pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    let cents = value.round_dp(2);
    if !cents.is_sign_positive() || cents.is_zero() {
        Err(invalid("positive", "Amount must be positive"))
    } else if cents > max_amount() {
        Err(invalid("max_amount", "Amount must be at most 999999999999.99"))
    } else {
        Ok(())
    }
}

/// Rejects names that are empty once surrounding whitespace is removed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("blank", "This field is required"))
    } else {
        Ok(())
    }
}

/// `#RRGGBB`, either case
pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    let ok = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(invalid("hex_color", "Color must be a hex value like #1A2B3C"))
    }
}

/// Roles that can be handed out through invitations and direct adds
pub fn assignable_role(role: &Role) -> Result<(), ValidationError> {
    if *role == Role::Owner {
        Err(invalid("role", "Role must be MEMBER, ADMIN or ACCOUNTANT"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[validate(length(min = 2))]
        display_name: String,
        #[validate(email)]
        email: String,
        #[validate(custom = "positive_amount")]
        amount: Decimal,
        #[validate(custom = "hex_color")]
        color: Option<String>,
    }

    fn sample(name: &str, email: &str, amount: i64, color: Option<&str>) -> Sample {
        Sample {
            display_name: name.into(),
            email: email.into(),
            amount: Decimal::new(amount, 2),
            color: color.map(String::from),
        }
    }

    #[test]
    fn valid_sample_passes() {
        assert!(sample("Ann", "ann@example.com", 100, Some("#a1B2c3")).validate().is_ok());
    }

    #[test]
    fn errors_are_keyed_by_camel_case_field() {
        let errors = sample("A", "nope", -5, Some("red")).validate().unwrap_err();
        let details = field_messages(&errors);

        assert_eq!(details["displayName"], "Must be at least 2 characters");
        assert_eq!(details["email"], "Invalid email address");
        assert_eq!(details["amount"], "Amount must be positive");
        assert!(details.contains_key("color"));
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(positive_amount(&Decimal::ZERO).is_err());
        assert!(positive_amount(&Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn amounts_beyond_the_column_are_rejected() {
        assert_eq!(max_amount().to_string(), "999999999999.99");
        assert!(positive_amount(&max_amount()).is_ok());
        assert!(positive_amount(&Decimal::new(10_000_000_000_000, 0)).is_err());
        assert!(positive_amount(&Decimal::new(1, 3)).is_err());
    }

    #[test]
    fn whitespace_names_are_blank() {
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
        assert!(not_blank(" Rent ").is_ok());
    }

    #[test]
    fn hex_color_shapes() {
        assert!(hex_color("#FFFFFF").is_ok());
        assert!(hex_color("#ffffff").is_ok());
        assert!(hex_color("FFFFFF").is_err());
        assert!(hex_color("#FFF").is_err());
        assert!(hex_color("#GGGGGG").is_err());
    }

    #[test]
    fn owner_is_not_assignable() {
        assert!(assignable_role(&Role::Owner).is_err());
        assert!(assignable_role(&Role::Accountant).is_ok());
    }

    #[test]
    fn converts_to_api_error() {
        let errors = sample("A", "ann@example.com", 100, None).validate().unwrap_err();
        let api: ApiError = errors.into();
        assert_eq!(api.status_code(), 400);
        assert_eq!(api.error_code(), "VALIDATION_ERROR");
    }
}
