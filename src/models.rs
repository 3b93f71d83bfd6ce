use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::model::role::Role;

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginReqDto {
    #[validate(email)]
    #[schema(example = "siti@sekolah.edu.my")]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginUser {
    pub id: u64,
    pub name: String,
    /// Every role the user holds.
    #[schema(example = json!(["GURU"]))]
    pub role: Vec<Role>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Email of the signed-in user
    pub sub: String,
    pub roles: Vec<Role>,
    pub exp: usize,
    pub jti: String,
}
