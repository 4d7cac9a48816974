//! Domain-level constants.
//!
//! These constants define business rules and the welcome message copy.

// =============================================================================
// Validation
// =============================================================================

/// Message returned when a required user field is missing or empty
pub const REQUIRED_FIELDS_MESSAGE: &str = "Nome e e-mail são obrigatórios.";

// =============================================================================
// Welcome notification
// =============================================================================

/// Subject line of the welcome email
pub const WELCOME_SUBJECT: &str = "Bem-vindo ao nosso sistema!";

/// Build the welcome email body for a user display name
pub fn welcome_body(name: &str) -> String {
    format!("Olá, {}! Seu cadastro foi realizado com sucesso.", name)
}
