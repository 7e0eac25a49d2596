use uuid::Uuid;

use crate::errors::{ProfileField, ValidationError, ValidationErrors};
use crate::profile::{Profile, ProfileInput};

/// Checks a raw form and turns it into a [`Profile`].
///
/// All fields are trimmed first. Every failing field is reported, not just
/// the first one. A missing `id` gets a fresh UUID.
pub fn validate(input: ProfileInput) -> Result<Profile, ValidationErrors> {
    let name = input.name.trim();
    let ip = input.ip.trim();
    let subnet = input.subnet.trim();
    let gateway = input.gateway.trim();
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(ValidationError {
            field: ProfileField::Name,
            reason: "must not be empty".into(),
        });
    }
    if let Err(reason) = check_dotted_quad(ip) {
        errors.push(ValidationError {
            field: ProfileField::Ip,
            reason,
        });
    }
    let prefix = match parse_prefix(subnet) {
        Ok(p) => Some(p),
        Err(reason) => {
            errors.push(ValidationError {
                field: ProfileField::Subnet,
                reason,
            });
            None
        }
    };
    if let Err(reason) = check_dotted_quad(gateway) {
        errors.push(ValidationError {
            field: ProfileField::Gateway,
            reason,
        });
    }

    match prefix {
        Some(subnet) if errors.is_empty() => Ok(Profile {
            id: input
                .id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: name.to_string(),
            ip: ip.to_string(),
            subnet,
            gateway: gateway.to_string(),
            dns: input.dns.trim().to_string(),
        }),
        _ => Err(ValidationErrors(errors)),
    }
}

/// `true` for a canonical dotted-quad IPv4 address.
pub fn is_dotted_quad(s: &str) -> bool {
    check_dotted_quad(s).is_ok()
}

fn check_dotted_quad(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".into());
    }
    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("expected 4 octets, got {}", octets.len()));
    }
    for octet in octets {
        if octet.is_empty() || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{octet}' is not a decimal octet"));
        }
        if octet.len() > 1 && octet.starts_with('0') {
            return Err(format!("'{octet}' has a leading zero"));
        }
        match octet.parse::<u16>() {
            Ok(n) if n <= 255 => {}
            _ => return Err(format!("'{octet}' is out of range 0-255")),
        }
    }
    Ok(())
}

fn parse_prefix(s: &str) -> Result<u8, String> {
    if s.is_empty() {
        return Err("must not be empty".into());
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{s}' is not an integer"));
    }
    match s.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(p),
        _ => Err(format!("'{s}' is out of range 0-32")),
    }
}
