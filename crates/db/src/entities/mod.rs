//! Database entities.

pub mod form;
pub mod question;
pub mod user;

pub use form::Entity as Form;
pub use question::Entity as Question;
pub use user::Entity as User;
