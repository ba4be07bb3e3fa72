//! Collaborators used alongside the request client

pub mod captcha;
pub mod user_agent;

pub use captcha::{encode_image, normalize_captcha_text, CaptchaSolver, GeminiSolver};
pub use user_agent::random_user_agent;
