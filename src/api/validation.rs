//! Input validation for form requests.
//!
//! Validators return the user-facing (Spanish) message on failure; handlers
//! collect them with the `ValidationErrorBuilder` from the `error` module.

use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Good-enough email shape check; deliverability is not our problem.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// National id numbers: digits only, 5-20 characters.
    static ref NATIONAL_ID_REGEX: Regex = Regex::new(r"^\d{5,20}$").unwrap();
}

pub const USER_STATES: [&str; 2] = ["Activo", "Inactivo"];
pub const USER_GENDERS: [&str; 2] = ["M", "F"];
pub const MEMBERSHIP_TYPES: [&str; 4] = ["Mensual", "Diaria", "Trimestral", "Anual"];

/// Validate an email address (required, well-formed, <= 255 chars)
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("El correo es obligatorio.".to_string());
    }
    if email.len() > 255 {
        return Err("El correo no puede exceder 255 caracteres.".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Ingrese un correo válido.".to_string());
    }
    Ok(())
}

/// Validate a login password (required, 6-255 chars)
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("La contraseña es obligatoria.".to_string());
    }
    if password.len() < 6 {
        return Err("La contraseña debe tener al menos 6 caracteres.".to_string());
    }
    if password.len() > 255 {
        return Err("La contraseña no puede exceder 255 caracteres.".to_string());
    }
    Ok(())
}

/// Validate a person name (required, <= 255 chars)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("El nombre es obligatorio.".to_string());
    }
    if name.len() > 255 {
        return Err("El nombre no puede exceder 255 caracteres.".to_string());
    }
    Ok(())
}

/// Validate a member national id number
pub fn validate_national_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("La cédula es obligatoria.".to_string());
    }
    if !NATIONAL_ID_REGEX.is_match(id) {
        return Err("La cédula debe ser numérica, de 5 a 20 dígitos.".to_string());
    }
    Ok(())
}

/// Validate a member gender tag
pub fn validate_gender(gender: &str) -> Result<(), String> {
    if USER_GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err("El género debe ser M o F.".to_string())
    }
}

/// Validate a member state tag
pub fn validate_state(state: &str) -> Result<(), String> {
    if USER_STATES.contains(&state) {
        Ok(())
    } else {
        Err("El estado debe ser Activo o Inactivo.".to_string())
    }
}

/// Validate a phone number (required, <= 20 chars)
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.trim().is_empty() {
        return Err("El teléfono es obligatorio.".to_string());
    }
    if phone.len() > 20 {
        return Err("El teléfono no puede exceder 20 caracteres.".to_string());
    }
    Ok(())
}

/// Validate a `YYYY-MM-DD` date field and return the parsed value
pub fn validate_date(value: &str) -> Result<NaiveDate, String> {
    if value.is_empty() {
        return Err("La fecha es obligatoria.".to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "La fecha no es válida.".to_string())
}

/// Validate an `HH:MM` time field and return the parsed value
pub fn validate_time(value: &str) -> Result<NaiveTime, String> {
    if value.is_empty() {
        return Err("La hora es obligatoria.".to_string());
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| "La hora debe tener formato HH:MM.".to_string())
}

/// Validate a membership type tag
pub fn validate_membership_type(kind: &str) -> Result<(), String> {
    if MEMBERSHIP_TYPES.contains(&kind) {
        Ok(())
    } else {
        Err(format!(
            "El tipo de membresía debe ser uno de: {}.",
            MEMBERSHIP_TYPES.join(", ")
        ))
    }
}

/// Validate a money amount (>= 0)
pub fn validate_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err("El monto debe ser un número mayor o igual a 0.".to_string());
    }
    Ok(())
}

/// Validate a discount percentage (0-100)
pub fn validate_discount(discount: f64) -> Result<(), String> {
    if !discount.is_finite() || !(0.0..=100.0).contains(&discount) {
        return Err("El descuento debe estar entre 0 y 100.".to_string());
    }
    Ok(())
}

/// Validate a payment method (required free text, <= 255 chars)
pub fn validate_payment_method(method: &str) -> Result<(), String> {
    if method.trim().is_empty() {
        return Err("El método de pago es obligatorio.".to_string());
    }
    if method.len() > 255 {
        return Err("El método de pago no puede exceder 255 caracteres.".to_string());
    }
    Ok(())
}

/// Normalize a person name: first letter of each word upper-cased, the rest
/// lower-cased.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.com").is_err());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("123456").is_ok());

        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_national_id() {
        assert!(validate_national_id("12345").is_ok());
        assert!(validate_national_id("12345678901234567890").is_ok());

        assert!(validate_national_id("").is_err());
        assert!(validate_national_id("1234").is_err());
        assert!(validate_national_id("123456789012345678901").is_err());
        assert!(validate_national_id("12a45").is_err());
    }

    #[test]
    fn test_validate_enums() {
        assert!(validate_gender("M").is_ok());
        assert!(validate_gender("F").is_ok());
        assert!(validate_gender("X").is_err());
        assert!(validate_gender("m").is_err());

        assert!(validate_state("Activo").is_ok());
        assert!(validate_state("Inactivo").is_ok());
        assert!(validate_state("activo").is_err());

        assert!(validate_membership_type("Mensual").is_ok());
        assert!(validate_membership_type("Anual").is_ok());
        assert!(validate_membership_type("Semanal").is_err());
    }

    #[test]
    fn test_validate_date_and_time() {
        assert_eq!(
            validate_date("2025-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(validate_date("2025-02-30").is_err());
        assert!(validate_date("28/02/2025").is_err());
        assert!(validate_date("").is_err());

        assert_eq!(
            validate_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(validate_time("9:30").is_ok());
        assert!(validate_time("25:00").is_err());
        assert!(validate_time("09:30:00").is_err());
        assert!(validate_time("").is_err());
    }

    #[test]
    fn test_validate_numeric_ranges() {
        assert!(validate_amount(0.0).is_ok());
        assert!(validate_amount(150.5).is_ok());
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());

        assert!(validate_discount(0.0).is_ok());
        assert!(validate_discount(100.0).is_ok());
        assert!(validate_discount(100.1).is_err());
        assert!(validate_discount(-5.0).is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("carlos pérez"), "Carlos Pérez");
        assert_eq!(title_case("MARÍA DE LOS ÁNGELES"), "María De Los Ángeles");
        assert_eq!(title_case("  ana   maría  "), "Ana María");
        assert_eq!(title_case(""), "");
    }
}
