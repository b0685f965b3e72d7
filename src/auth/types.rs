// Authentication wire types

use serde::{Deserialize, Serialize};

use crate::models::User;

/// `POST /auth/login` request
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /auth/login` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// `POST /auth/refresh` request
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub token: &'a str,
}

/// `POST /auth/refresh` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// `POST /auth/register` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub usersurname: String,
    pub email: String,
    pub password: String,
    /// Opaque token from a CAPTCHA provider, forwarded as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_token: Option<String>,
}

/// `POST /auth/forgot-password` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_request_omits_missing_captcha() {
        let req = RegisterRequest {
            username: "anna".into(),
            usersurname: "K".into(),
            email: "a@b.com".into(),
            password: "secret".into(),
            captcha_token: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("captchaToken").is_none());

        let req = RegisterRequest {
            captcha_token: Some("cap".into()),
            ..req
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["captchaToken"], "cap");
    }

    #[test]
    fn test_forgot_password_field_names() {
        let req = ForgotPasswordRequest {
            email: "a@b.com".into(),
            new_password: "n3w".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"email": "a@b.com", "newPassword": "n3w"})
        );
    }

    #[test]
    fn test_refresh_wire_shapes() {
        assert_eq!(
            serde_json::to_value(RefreshRequest { token: "r" }).unwrap(),
            json!({"token": "r"})
        );

        let res: RefreshResponse = serde_json::from_str(r#"{"accessToken":"a"}"#).unwrap();
        assert_eq!(res.access_token, "a");
    }
}
