pub mod bybit;
pub mod trbinance;
