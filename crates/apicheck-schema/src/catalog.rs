//! The schema catalog shipped in the repository's `schemas/` directory,
//! embedded at compile time so test suites need no filesystem access.

/// `(name, JSON source)` for every built-in schema.
pub const BUILTIN: &[(&str, &str)] = &[
    (
        "login-request",
        include_str!("../../../schemas/login-request.schema.json"),
    ),
    (
        "login-response",
        include_str!("../../../schemas/login-response.schema.json"),
    ),
    (
        "medication-request",
        include_str!("../../../schemas/medication-request.schema.json"),
    ),
    (
        "medication-response",
        include_str!("../../../schemas/medication-response.schema.json"),
    ),
    (
        "resource-create-request",
        include_str!("../../../schemas/resource-create-request.schema.json"),
    ),
    (
        "resource-create-response",
        include_str!("../../../schemas/resource-create-response.schema.json"),
    ),
    (
        "resource-update-request",
        include_str!("../../../schemas/resource-update-request.schema.json"),
    ),
    (
        "resource-update-response",
        include_str!("../../../schemas/resource-update-response.schema.json"),
    ),
    (
        "user-create-request",
        include_str!("../../../schemas/user-create-request.schema.json"),
    ),
    (
        "user-register-request",
        include_str!("../../../schemas/user-register-request.schema.json"),
    ),
];

pub const LOGIN_REQUEST: &str = "login-request";
pub const LOGIN_RESPONSE: &str = "login-response";
pub const MEDICATION_REQUEST: &str = "medication-request";
pub const MEDICATION_RESPONSE: &str = "medication-response";
pub const RESOURCE_CREATE_REQUEST: &str = "resource-create-request";
pub const RESOURCE_CREATE_RESPONSE: &str = "resource-create-response";
pub const RESOURCE_UPDATE_REQUEST: &str = "resource-update-request";
pub const RESOURCE_UPDATE_RESPONSE: &str = "resource-update-response";
pub const USER_REGISTER_REQUEST: &str = "user-register-request";
pub const USER_CREATE_REQUEST: &str = "user-create-request";
