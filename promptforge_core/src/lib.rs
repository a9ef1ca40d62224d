pub mod contracts;
pub mod error;
pub mod ids;
pub mod jwt;
pub mod middlewares;
pub mod state;

pub use contracts::AuthContext;
pub use error::{CoreError, ErrorMapper};
pub use ids::{PromptId, SessionId, UserId};
pub use jwt::{AuthTokens, Claims, Principal, Role, TokenManager, TokenManagerTrait, TokenType};
pub use middlewares::{SetLayer, TokenVerifier};
pub use state::WithTokenManager;
