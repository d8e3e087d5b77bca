use super::{types::Config, ConfigError};
use crate::intake::normalize;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Identifier prefix is alphabetic, width and attempts are positive
/// - Intake tokens are non-empty and distinct from each other as the chat
///   compares them, and the search prefix cannot shadow the trigger phrase
/// - Timeouts and sweep intervals are non-zero
/// - Configured delivery endpoints have a URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let identifier = &config.identifier;
    if identifier.prefix.is_empty() || !identifier.prefix.chars().all(|c| c.is_alphabetic()) {
        return Err(invalid("identifier.prefix must be a non-empty alphabetic string"));
    }
    if identifier.width == 0 {
        return Err(invalid("identifier.width must be at least 1"));
    }
    if identifier.max_attempts == 0 {
        return Err(invalid("identifier.max_attempts must be at least 1"));
    }

    let intake = &config.intake;
    let tokens = [
        ("intake.trigger_phrase", &intake.trigger_phrase),
        ("intake.affirmative", &intake.affirmative),
        ("intake.negative", &intake.negative),
        ("intake.cancel_phrase", &intake.cancel_phrase),
    ];
    for (name, value) in &tokens {
        if value.trim().is_empty() {
            return Err(invalid(&format!("{} cannot be empty", name)));
        }
    }
    for (i, (name_a, a)) in tokens.iter().enumerate() {
        for (name_b, b) in &tokens[i + 1..] {
            if normalize(a) == normalize(b) {
                return Err(invalid(&format!("{} and {} must differ", name_a, name_b)));
            }
        }
    }

    let search = normalize(&intake.search_prefix);
    let trigger = normalize(&intake.trigger_phrase);
    if search.is_empty() {
        return Err(invalid("intake.search_prefix cannot be empty"));
    }
    if trigger == search || trigger.starts_with(&format!("{} ", search)) {
        return Err(invalid("intake.search_prefix cannot collide with intake.trigger_phrase"));
    }
    if intake.search_result_limit == 0 {
        return Err(invalid("intake.search_result_limit must be at least 1"));
    }

    if config.reports.render_timeout_secs == 0 {
        return Err(invalid("reports.render_timeout_secs cannot be 0"));
    }
    if config.delivery.attempt_timeout_secs == 0 {
        return Err(invalid("delivery.attempt_timeout_secs cannot be 0"));
    }
    if let Some(email) = &config.delivery.email {
        if email.url.is_empty() || email.from_address.is_empty() {
            return Err(invalid("delivery.email requires url and from_address"));
        }
    }
    if let Some(messaging) = &config.delivery.messaging {
        if messaging.url.is_empty() {
            return Err(invalid("delivery.messaging.url cannot be empty"));
        }
    }

    if config.scheduler.report_sweep_interval_ms == 0
        || config.scheduler.delivery_sweep_interval_ms == 0
    {
        return Err(invalid("scheduler intervals cannot be 0"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
