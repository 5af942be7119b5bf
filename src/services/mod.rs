pub mod auth;
pub mod companies;
pub mod metrics;
pub mod notifications;
pub mod slots;
pub mod tenancy;
pub mod transactions;
pub mod webhook;
