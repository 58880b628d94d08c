//! Test fixtures for common request payloads

use serde_json::{json, Value};

/// Fixed actor ids used across tests
pub mod actors {
    pub const ADMIN: &str = "admin-1";
    pub const REVIEWER: &str = "reviewer-7";
}

/// Contact email derived from an institution name
pub fn contact_email(name: &str) -> String {
    format!(
        "contact@{}.example.org",
        name.to_lowercase().replace(' ', "-")
    )
}

/// Institution registration payload
pub fn institution_payload(name: &str) -> Value {
    json!({
        "name": name,
        "organizationType": "university",
        "contact": {
            "contactPerson": "Dana Contact",
            "email": contact_email(name),
            "phone": "+1 555 0100"
        },
        "apiEndpoint": format!("https://{}.example.org/api", name.to_lowercase().replace(' ', "-")),
        "description": format!("{} test institution", name),
        "userId": actors::ADMIN
    })
}

/// Access request payload
pub fn request_payload(consumer_id: &str, provider_id: &str, title: &str) -> Value {
    json!({
        "title": title,
        "description": "Enrollment statistics exchange",
        "purpose": "Research",
        "consumerId": consumer_id,
        "providerId": provider_id,
        "priority": "high",
        "responseFormat": "json",
        "attributes": ["name", "enrollmentYear"],
        "userId": actors::ADMIN
    })
}

/// User registration payload
pub fn user_payload(name: &str, role: &str, institution_id: Option<&str>) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        "role": role,
        "institutionId": institution_id,
        "userId": actors::ADMIN
    })
}
