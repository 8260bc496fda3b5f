//! Database repositories.

mod form;
mod question;
mod user;

pub use form::{FormRepository, FormWithQuestions};
pub use question::{OrderUpdate, QuestionRepository};
pub use user::UserRepository;
