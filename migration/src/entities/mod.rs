pub mod url;
pub mod user;

pub use url::Entity as UrlEntity;
pub use user::Entity as UserEntity;
