use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::prelude::FromRow;

use crate::models::error::ApiError;

#[derive(FromRow, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub location: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
}

/// Fields a `PUT /api/user/profile` may change. `image: Some(None)` clears the
/// image.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.village.is_none()
            && self.district.is_none()
            && self.state.is_none()
    }

    /// Validates a raw request body field by field, in a fixed order, so the
    /// first offending field decides the error code.
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let fields = as_object(body)?;
        let mut update = ProfileUpdate::default();

        if let Some(name) = fields.get("name") {
            let name = name
                .as_str()
                .ok_or_else(|| bad_request("Name must be a string", "INVALID_NAME"))?
                .trim();
            if name.is_empty() {
                return Err(bad_request("Name cannot be empty", "INVALID_NAME"));
            }
            update.name = Some(name.to_string());
        }

        if let Some(image) = fields.get("image") {
            update.image = match image {
                Value::Null => Some(None),
                Value::String(url) => Some(Some(url.clone())),
                _ => {
                    return Err(bad_request(
                        "Image must be a string or null",
                        "INVALID_IMAGE",
                    ))
                }
            };
        }

        update.village = trimmed_string(fields, "village", "Village", "INVALID_VILLAGE")?;
        update.district = trimmed_string(fields, "district", "District", "INVALID_DISTRICT")?;
        update.state = trimmed_string(fields, "state", "State", "INVALID_STATE")?;

        if update.is_empty() {
            return Err(bad_request(
                "At least one field must be provided",
                "NO_FIELDS_PROVIDED",
            ));
        }
        Ok(update)
    }
}

/// Validates a `PATCH /api/user/profile` body and returns the trimmed location.
pub fn location_from_body(body: &Value) -> Result<String, ApiError> {
    let fields = as_object(body)?;
    let location = fields
        .get("location")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| bad_request("Location is required", "MISSING_LOCATION"))?
        .trim();

    if location.is_empty() {
        return Err(bad_request("Location cannot be empty", "INVALID_LOCATION"));
    }
    Ok(location.to_string())
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| bad_request("Request body must be a JSON object", "INVALID_BODY"))
}

fn trimmed_string(
    fields: &Map<String, Value>,
    key: &str,
    label: &str,
    code: &str,
) -> Result<Option<String>, ApiError> {
    match fields.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(bad_request(&format!("{} must be a string", label), code)),
    }
}

fn bad_request(message: &str, code: &str) -> ApiError {
    ApiError::coded(StatusCode::BAD_REQUEST, message, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code_of(err: ApiError) -> String {
        err.body.0["code"].as_str().unwrap_or_default().to_string()
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = ProfileUpdate::from_body(&json!({ "name": "   " })).unwrap_err();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert_eq!(code_of(err), "INVALID_NAME");
    }

    #[test]
    fn numeric_district_is_rejected() {
        let err = ProfileUpdate::from_body(&json!({ "district": 123 })).unwrap_err();
        assert_eq!(code_of(err), "INVALID_DISTRICT");
    }

    #[test]
    fn first_invalid_field_wins() {
        let err = ProfileUpdate::from_body(&json!({ "state": 1, "village": false })).unwrap_err();
        assert_eq!(code_of(err), "INVALID_VILLAGE");
    }

    #[test]
    fn image_may_be_cleared_with_null() {
        let update = ProfileUpdate::from_body(&json!({ "image": null })).unwrap();
        assert_eq!(update.image, Some(None));
        let err = ProfileUpdate::from_body(&json!({ "image": 7 })).unwrap_err();
        assert_eq!(code_of(err), "INVALID_IMAGE");
    }

    #[test]
    fn fields_are_trimmed() {
        let update = ProfileUpdate::from_body(&json!({
            "name": "  Sita Devi ",
            "village": " Bero ",
            "district": "Ranchi "
        }))
        .unwrap();
        assert_eq!(update.name.as_deref(), Some("Sita Devi"));
        assert_eq!(update.village.as_deref(), Some("Bero"));
        assert_eq!(update.district.as_deref(), Some("Ranchi"));
        assert_eq!(update.state, None);
    }

    #[test]
    fn unknown_fields_only_is_an_empty_update() {
        let err = ProfileUpdate::from_body(&json!({ "email": "x@y.z" })).unwrap_err();
        assert_eq!(code_of(err), "NO_FIELDS_PROVIDED");
    }

    #[test]
    fn location_rules() {
        assert_eq!(code_of(location_from_body(&json!({})).unwrap_err()), "MISSING_LOCATION");
        assert_eq!(
            code_of(location_from_body(&json!({ "location": 5 })).unwrap_err()),
            "MISSING_LOCATION"
        );
        assert_eq!(
            code_of(location_from_body(&json!({ "location": "  " })).unwrap_err()),
            "INVALID_LOCATION"
        );
        assert_eq!(
            location_from_body(&json!({ "location": " Dumka " })).unwrap(),
            "Dumka"
        );
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(code_of(ProfileUpdate::from_body(&json!([1])).unwrap_err()), "INVALID_BODY");
    }

    #[test]
    fn update_serialises_only_present_fields() {
        let update = ProfileUpdate {
            image: Some(None),
            state: Some("Jharkhand".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "image": null, "state": "Jharkhand" })
        );
    }
}
