//! REST endpoints the client consumes, relative to `api.base_url`.

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const GOOGLE: &str = "/auth/google";
pub const REFRESH: &str = "/auth/refresh";
pub const LOGOUT: &str = "/auth/logout";
pub const ME: &str = "/auth/me";
