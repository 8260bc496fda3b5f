//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod form;
pub mod question;

pub use auth::{AuthService, AuthSession, LoginInput, PublicUser, RegisterInput};
pub use form::{CreateFormInput, FormService, UpdateFormInput};
pub use question::{
    CreateQuestionInput, QuestionOptions, QuestionService, UpdateQuestionInput,
};
