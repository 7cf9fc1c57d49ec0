mod connection;
mod session;

pub use connection::connect;
pub use session::PgSession;
