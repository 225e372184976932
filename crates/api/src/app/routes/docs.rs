//! Static OpenAPI 3 description of the HTTP surface.

use axum::Json;
use serde_json::{json, Map, Value};

/// (method, path, summary, roles allowed; empty = public)
const ROUTES: &[(&str, &str, &str, &[&str])] = &[
    ("post", "/api/auth/register", "Register a new user", &[]),
    ("post", "/api/auth/login", "Log in and receive a bearer token", &[]),
    ("get", "/api/auth/profile", "Current user's profile", &["ADMIN", "FACILITATOR", "STUDENT"]),
    ("get", "/api/auth/users", "List all users", &["ADMIN"]),
    ("put", "/api/auth/users/{id}", "Update a user", &["ADMIN", "FACILITATOR"]),
    ("delete", "/api/auth/users/{id}", "Delete a user", &["ADMIN"]),
    ("patch", "/api/auth/users/{id}/role", "Change a user's role", &["ADMIN"]),
    ("post", "/api/cohorts", "Create a cohort", &["ADMIN"]),
    ("get", "/api/cohorts", "List cohorts", &["ADMIN", "FACILITATOR", "STUDENT"]),
    ("get", "/api/cohorts/{id}", "Get a cohort", &["ADMIN", "FACILITATOR", "STUDENT"]),
    ("put", "/api/cohorts/{id}", "Update a cohort", &["ADMIN"]),
    ("delete", "/api/cohorts/{id}", "Delete a cohort", &["ADMIN"]),
    ("post", "/api/students", "Enrol a student", &["ADMIN", "FACILITATOR"]),
    ("get", "/api/students", "List students", &["ADMIN", "FACILITATOR"]),
    ("get", "/api/students/{id}", "Get a student", &["ADMIN", "FACILITATOR", "STUDENT"]),
    ("put", "/api/students/{id}", "Update a student", &["ADMIN", "FACILITATOR"]),
    ("delete", "/api/students/{id}", "Delete a student", &["ADMIN"]),
    ("get", "/health", "Liveness check", &[]),
];

pub async fn api_docs() -> Json<Value> {
    Json(openapi_document())
}

pub fn openapi_document() -> Value {
    let mut paths = Map::new();
    for (method, path, summary, roles) in ROUTES {
        let mut operation = json!({
            "summary": summary,
            "responses": { "default": { "description": "see error envelope" } },
        });
        if !roles.is_empty() {
            operation["security"] = json!([{ "bearerAuth": [] }]);
            operation["x-roles"] = json!(roles);
        }
        if path.contains("{id}") {
            operation["parameters"] = json!([{
                "name": "id",
                "in": "path",
                "required": true,
                "schema": { "type": "string", "format": "uuid" },
            }]);
        }

        let entry = paths
            .entry(path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(method.to_string(), operation);
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": { "title": "PMS API", "version": "1.0.0" },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_once() {
        let doc = openapi_document();
        assert_eq!(doc["info"]["title"], "PMS API");
        assert_eq!(doc["info"]["version"], "1.0.0");

        let paths = doc["paths"].as_object().unwrap();
        let operations: usize = paths.values().map(|m| m.as_object().unwrap().len()).sum();
        assert_eq!(operations, ROUTES.len());
        assert!(paths["/api/cohorts/{id}"]["delete"]["security"].is_array());
        assert!(paths["/api/auth/login"]["post"].get("security").is_none());
    }
}
