//! Request bodies sent to the auth endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::value::AnyJson;

/// Which identifier a password sign-in carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Username,
}

/// Purpose of a one-time password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OtpType {
    Signup,
    Email,
    Recovery,
    EmailChange,
    MagicLink,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a BTreeMap<String, AnyJson>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    pub password: &'a str,
}

impl<'a> SignInRequest<'a> {
    pub fn new(identifier: &'a str, password: &'a str, kind: IdentifierKind) -> Self {
        let (email, username) = match kind {
            IdentifierKind::Email => (Some(identifier), None),
            IdentifierKind::Username => (None, Some(identifier)),
        };
        Self {
            email,
            username,
            password,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResendOtpRequest<'a> {
    pub email: &'a str,
    #[serde(rename = "type")]
    pub kind: OtpType,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub email: &'a str,
    pub token: &'a str,
    #[serde(rename = "type")]
    pub kind: OtpType,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResetPasswordRequest<'a> {
    pub reset_token: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatePasswordRequest<'a> {
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}
