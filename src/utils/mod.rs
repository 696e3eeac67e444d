pub mod exchange_rate;
pub mod http;
pub mod translate;
