//! Per-endpoint schemas for the account routes
//!
//! Client code matches on these message strings, so they are part of the
//! wire contract.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{AsyncRule, CrossFieldRule, FieldMessages, FieldRule, Schema, ShapeRule};
use crate::repository::USERNAME_TAKEN_MESSAGE;

static FULL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("valid full name pattern"));

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8,14}$").expect("valid phone pattern"));

pub const PHONE_FORMAT_MESSAGE: &str =
    "Phone must a string of digits with 8 to 14 characters in length";
pub const REPEAT_PASSWORD_MESSAGE: &str = "Repeat password must be same with password.";

const PROFILE_USERNAME: FieldMessages = FieldMessages {
    type_error: "Username should be a type of string.",
    required: "Username required.",
};

const LOGIN_USERNAME: FieldMessages = FieldMessages {
    type_error: "Username must be a type of string.",
    required: "Username required.",
};

const PASSWORD: FieldMessages = FieldMessages {
    type_error: "Password must be a type of string.",
    required: "Password required.",
};

const FULL_NAME: FieldMessages = FieldMessages {
    type_error: "Fullname must be a type of string.",
    required: "Fullname required.",
};

const PHONE: FieldMessages = FieldMessages {
    type_error: PHONE_FORMAT_MESSAGE,
    required: "phone required.",
};

fn full_name_field() -> FieldRule {
    FieldRule::required("name", FULL_NAME)
        .with(ShapeRule::MinLength {
            min: 2,
            message: "Fullname must have at least 2 characters.",
        })
        .with(ShapeRule::Pattern {
            regex: &FULL_NAME_PATTERN,
            message: "Special characters are not allowed or invalid fullname.",
        })
}

fn phone_rule() -> ShapeRule {
    ShapeRule::Pattern {
        regex: &PHONE_PATTERN,
        message: PHONE_FORMAT_MESSAGE,
    }
}

/// `POST /users/register`
pub fn user_register_schema() -> Schema {
    Schema::new("UserRegisterSchema")
        .field(FieldRule::required("user", PROFILE_USERNAME))
        .field(
            FieldRule::required("pass", PASSWORD)
                .with(ShapeRule::MinLength {
                    min: 6,
                    message: "Password must have at least 6 characters.",
                })
                .with(ShapeRule::NoSpaces {
                    message: "Space characters are not allowed in password.",
                }),
        )
        .field(full_name_field())
        .field(FieldRule::optional("phone", PHONE).with(phone_rule()))
        .cross_field(CrossFieldRule::MustEqual {
            field: "pass_repeat",
            other: "pass",
            message: REPEAT_PASSWORD_MESSAGE,
        })
        .async_rule(AsyncRule::UsernameAvailable {
            field: "user",
            message: USERNAME_TAKEN_MESSAGE,
        })
}

/// `POST /users/login`
pub fn user_login_schema() -> Schema {
    Schema::new("UserLoginSchema")
        .field(FieldRule::required("username", LOGIN_USERNAME))
        .field(FieldRule::required("password", PASSWORD))
}

/// `POST /users/checkUserExists`
pub fn user_check_schema() -> Schema {
    Schema::new("UserCheckSchema").field(FieldRule::required("username", LOGIN_USERNAME))
}

/// `PUT /users/profile`
pub fn user_update_schema() -> Schema {
    Schema::new("UserUpdateSchema")
        .field(FieldRule::required("user", PROFILE_USERNAME))
        .field(full_name_field())
        .field(FieldRule::required("phone", PHONE).with(phone_rule()))
}
