// Business domains
pub mod pairing;
pub mod session;
