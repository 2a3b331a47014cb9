pub mod jwt;
pub mod validator;

pub use jwt::{Claims, JwtService, TokenType};
pub use validator::JwtValidator;
