pub mod api;
pub mod callback_server;
pub mod checkout;
pub mod payment;
pub mod session;
pub mod settings;
