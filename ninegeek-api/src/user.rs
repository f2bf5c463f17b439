use crate::Error;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct LoginRequest {
    pub username: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if crate::validate_required_string(&self.username) {
            Ok(())
        } else {
            Err(Error::InvalidRequest)
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
}

impl LoginResponse {
    pub fn logged_in(username: String) -> LoginResponse {
        LoginResponse {
            message: String::from("User logged in"),
            username,
        }
    }
}
